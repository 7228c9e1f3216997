use std::sync::Arc;
use std::time::Duration;

use barberpro_sync::application::ports::local_store::LocalStore;
use barberpro_sync::application::services::{CoordinatorSettings, NetworkMonitor, SyncCoordinator};
use barberpro_sync::domain::entities::{Customer, NewCustomer, Record};
use barberpro_sync::domain::value_objects::{Collection, RecordId, SyncStatus};
use barberpro_sync::infrastructure::offline::SqliteLocalStore;
use chrono::{DateTime, NaiveDate, Utc};

use super::mocks::{MockConnectivity, MockRemoteStore};

pub struct SyncHarness {
    pub store: Arc<SqliteLocalStore>,
    pub remote: Arc<MockRemoteStore>,
    pub probe: Arc<MockConnectivity>,
    pub monitor: Arc<NetworkMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl SyncHarness {
    /// Flips the probe and polls once. Returns whether that was a rising edge.
    pub async fn set_online(&self, online: bool) -> bool {
        self.probe.set_online(online);
        self.monitor.poll_once().await
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.store
            .all_records(Collection::Customers)
            .await
            .expect("list customers")
            .into_iter()
            .filter_map(Record::into_customer)
            .collect()
    }

    pub async fn customer(&self, id: &RecordId) -> Option<Customer> {
        self.customers().await.into_iter().find(|c| &c.id == id)
    }
}

/// In-memory store, offline probe, auto-drain off.
pub async fn harness() -> SyncHarness {
    harness_with(MockRemoteStore::new(), manual_settings()).await
}

pub async fn harness_with(remote: MockRemoteStore, settings: CoordinatorSettings) -> SyncHarness {
    let store = Arc::new(SqliteLocalStore::in_memory());
    store.initialize().await.expect("initialize store");
    harness_on(store, Arc::new(remote), settings)
}

pub fn harness_on(
    store: Arc<SqliteLocalStore>,
    remote: Arc<MockRemoteStore>,
    settings: CoordinatorSettings,
) -> SyncHarness {
    let probe = Arc::new(MockConnectivity::offline());
    let monitor = Arc::new(NetworkMonitor::new(probe.clone(), Duration::from_secs(5)));
    let coordinator = Arc::new(SyncCoordinator::new(
        store.clone(),
        remote.clone(),
        monitor.clone(),
        settings,
    ));
    SyncHarness {
        store,
        remote,
        probe,
        monitor,
        coordinator,
    }
}

pub fn manual_settings() -> CoordinatorSettings {
    CoordinatorSettings {
        auto_drain: false,
        ..CoordinatorSettings::default()
    }
}

pub fn new_customer(name: &str, mobile: &str) -> NewCustomer {
    NewCustomer {
        name: name.to_string(),
        mobile: mobile.to_string(),
        visit_date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"),
        services: vec!["Haircut".to_string()],
        payment_amount: 25.0,
        birthday: None,
        notes: None,
        photo_uri: None,
    }
}

pub fn synced_customer(id: &str, name: &str, created_ms: i64) -> Customer {
    Customer {
        id: RecordId::new(id.to_string()).expect("record id"),
        name: name.to_string(),
        mobile: "+15550001111".to_string(),
        visit_date: NaiveDate::from_ymd_opt(2025, 5, 20).expect("date"),
        services: vec!["Shave".to_string()],
        payment_amount: 15.0,
        birthday: None,
        notes: None,
        photo_uri: None,
        created_at: DateTime::<Utc>::from_timestamp_millis(created_ms).expect("timestamp"),
        updated_at: None,
        sync_status: SyncStatus::Synced,
    }
}

pub fn file_database_url(dir: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("BarberPro.db").display())
}

/// Polls `check` until it holds or the timeout passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
