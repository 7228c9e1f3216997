mod common;

use std::sync::Arc;
use std::time::Duration;

use barberpro_sync::application::ports::connectivity::ReachabilityListener;
use barberpro_sync::application::ports::local_store::LocalStore;
use barberpro_sync::application::services::{CoordinatorSettings, SyncState};
use barberpro_sync::domain::entities::{OperationPayload, Record};
use barberpro_sync::domain::value_objects::{Collection, SyncStatus};
use barberpro_sync::infrastructure::offline::SqliteLocalStore;
use barberpro_sync::{AppConfig, AppState};
use common::mocks::{MockConnectivity, MockRemoteStore, RemoteCall};
use common::sync_support::{eventually, harness, harness_with, new_customer};

#[tokio::test]
async fn visit_recorded_offline_reaches_the_backend_on_reconnect() {
    let h = harness().await;

    let alice = h
        .coordinator
        .create_customer(new_customer("Alice", "+15551234567"))
        .await
        .unwrap();
    assert_eq!(
        h.customer(&alice.id).await.unwrap().sync_status,
        SyncStatus::Pending
    );
    assert_eq!(h.store.pending_operations().await.unwrap().len(), 1);
    assert!(h.remote.calls().is_empty());

    assert!(h.set_online(true).await);
    h.coordinator.on_reachable().await;

    assert_eq!(
        h.remote.write_calls(),
        vec![RemoteCall::Create(alice.id.to_string())]
    );
    assert_eq!(
        h.customer(&alice.id).await.unwrap().sync_status,
        SyncStatus::Synced
    );
    assert!(h.store.pending_operations().await.unwrap().is_empty());
    assert_eq!(h.coordinator.state(), SyncState::Idle);

    // Dropping and regaining the connection finds nothing left to send.
    assert!(!h.set_online(false).await);
    assert!(h.set_online(true).await);
    h.coordinator.on_reachable().await;
    assert_eq!(h.remote.write_calls().len(), 1);
}

#[tokio::test]
async fn staying_online_is_not_a_new_edge() {
    let h = harness().await;
    assert!(h.set_online(true).await);
    assert!(!h.set_online(true).await);
    assert!(!h.set_online(false).await);
    assert!(h.set_online(true).await);
}

#[tokio::test]
async fn enqueue_while_online_drains_in_the_background() {
    let h = harness_with(MockRemoteStore::new(), CoordinatorSettings::default()).await;
    h.set_online(true).await;

    let bob = h
        .coordinator
        .create_customer(new_customer("Bob", "+15557654321"))
        .await
        .unwrap();

    let remote = h.remote.clone();
    let id = bob.id.to_string();
    assert!(
        eventually(Duration::from_secs(5), || {
            let remote = remote.clone();
            let id = id.clone();
            async move { remote.row(&id).is_some() }
        })
        .await
    );
    assert!(
        eventually(Duration::from_secs(5), || {
            let (h, id) = (&h, &bob.id);
            async move {
                matches!(h.customer(id).await, Some(c) if c.sync_status == SyncStatus::Synced)
            }
        })
        .await
    );
}

#[tokio::test]
async fn enqueue_while_offline_waits_for_the_network() {
    let h = harness_with(MockRemoteStore::new(), CoordinatorSettings::default()).await;

    h.coordinator
        .create_customer(new_customer("Carol", "+15550002222"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.remote.calls().is_empty());
    assert_eq!(h.store.pending_operations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn running_app_state_syncs_after_connectivity_returns() {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.network.poll_interval_secs = 1;

    let store = Arc::new(SqliteLocalStore::in_memory());
    let remote = Arc::new(MockRemoteStore::new());
    let probe = Arc::new(MockConnectivity::offline());
    let state = AppState::assemble(config, store, remote.clone(), probe.clone())
        .await
        .unwrap();
    state.start();
    state.start();

    let customer = state
        .sync_coordinator
        .create_customer(new_customer("Dana", "+15550003333"))
        .await
        .unwrap();
    let pending = state.records(Collection::Customers).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(!state.is_online().await);

    probe.set_online(true);
    let synced = eventually(Duration::from_secs(5), || {
        let (state, id) = (&state, &customer.id);
        async move {
            state
                .records(Collection::Customers)
                .await
                .unwrap()
                .iter()
                .any(|record| record.id() == id && record.sync_status() == SyncStatus::Synced)
        }
    })
    .await;
    assert!(synced, "customer never reached the backend");
    assert!(state.is_online().await);
    assert_eq!(
        remote.write_calls(),
        vec![RemoteCall::Create(customer.id.to_string())]
    );

    let snapshot = state
        .analytics(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(snapshot.today_customers, 1);

    state.shutdown().await;
}

#[tokio::test]
async fn raw_operations_can_be_queued_through_app_state() {
    let store = Arc::new(SqliteLocalStore::in_memory());
    let state = AppState::assemble(
        AppConfig::default(),
        store,
        Arc::new(MockRemoteStore::new()),
        Arc::new(MockConnectivity::offline()),
    )
    .await
    .unwrap();

    let customer = new_customer("Eve", "+15550004444")
        .into_customer("c-eve".parse().unwrap(), chrono::Utc::now());
    let operation = state
        .queue_operation(OperationPayload::CreateCustomer {
            customer: customer.clone(),
        })
        .await
        .unwrap();
    assert_eq!(operation.record_id(), &customer.id);

    let records = state.records(Collection::Customers).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(&records[0], Record::Customer(c) if c.name == "Eve"));

    state.shutdown().await;
}
