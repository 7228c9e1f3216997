use crate::application::ports::connectivity::ReachabilityListener;
use crate::application::ports::local_store::LocalStore;
use crate::application::ports::remote_store::RemoteStore;
use crate::application::services::network_monitor::NetworkMonitor;
use crate::domain::entities::{
    Customer, CustomerPatch, NewCustomer, OperationPayload, Record, RecordPatch, SyncOperation,
};
use crate::domain::value_objects::{Collection, RecordId};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Draining,
    ReconcilingFromServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    Completed,
    SkippedOffline,
    AlreadyDraining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub outcome: DrainOutcome,
    pub attempted: u32,
    pub synced: u32,
    pub failed: u32,
}

impl DrainReport {
    fn skipped(outcome: DrainOutcome) -> Self {
        Self {
            outcome,
            attempted: 0,
            synced: 0,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub inserted_or_updated: u32,
    pub kept_local: u32,
    pub removed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Start a background drain after every successful enqueue while online.
    pub auto_drain: bool,
    /// How long confirmed operations stay in the log before compaction.
    pub queue_retention: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            auto_drain: true,
            queue_retention: Duration::hours(24),
        }
    }
}

impl From<&AppConfig> for CoordinatorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            auto_drain: config.sync.auto_drain,
            queue_retention: config.queue_retention(),
        }
    }
}

/// Puts the coordinator back to `Idle` when a drain or reconcile ends,
/// including when its future is dropped midway.
struct StateGuard<'a> {
    state: &'a RwLock<SyncState>,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a RwLock<SyncState>, next: SyncState) -> Self {
        *state.write().unwrap_or_else(PoisonError::into_inner) = next;
        Self { state }
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SyncState::Idle;
    }
}

/// Owns delivery of queued operations and merging of server state.
pub struct SyncCoordinator {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    network: Arc<NetworkMonitor>,
    settings: CoordinatorSettings,
    state: RwLock<SyncState>,
    drain_gate: Mutex<()>,
    exclusive: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        network: Arc<NetworkMonitor>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            store,
            remote,
            network,
            settings,
            state: RwLock::new(SyncState::Idle),
            drain_gate: Mutex::new(()),
            exclusive: Mutex::new(()),
        }
    }

    pub async fn is_online(&self) -> bool {
        self.network.current_status().await
    }

    pub fn state(&self) -> SyncState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_syncing(&self) -> bool {
        self.state() != SyncState::Idle
    }

    /// Durably records the mutation and its optimistic local effect, then
    /// kicks off a background drain when online. Storage failures propagate.
    pub async fn queue_operation(
        self: &Arc<Self>,
        payload: OperationPayload,
    ) -> Result<SyncOperation, AppError> {
        payload.validate().map_err(AppError::Validation)?;

        let operation = SyncOperation::new(payload);
        self.store.stage_operation(&operation).await?;
        tracing::info!(
            target: "sync::drain",
            operation_id = %operation.id,
            collection = %operation.collection(),
            kind = %operation.kind(),
            record_id = %operation.record_id(),
            "operation queued"
        );

        if self.settings.auto_drain && self.is_online().await {
            self.trigger_drain();
        }
        Ok(operation)
    }

    pub async fn create_customer(self: &Arc<Self>, input: NewCustomer) -> Result<Customer, AppError> {
        input.validate().map_err(AppError::Validation)?;
        let customer = input.into_customer(RecordId::generate(), Utc::now());
        self.queue_operation(OperationPayload::CreateCustomer {
            customer: customer.clone(),
        })
        .await?;
        Ok(customer)
    }

    pub async fn update_customer(
        self: &Arc<Self>,
        id: RecordId,
        patch: CustomerPatch,
    ) -> Result<SyncOperation, AppError> {
        self.queue_operation(OperationPayload::UpdateCustomer { id, patch })
            .await
    }

    pub async fn delete_customer(self: &Arc<Self>, id: RecordId) -> Result<SyncOperation, AppError> {
        self.queue_operation(OperationPayload::DeleteCustomer { id })
            .await
    }

    /// Fire-and-forget drain.
    pub fn trigger_drain(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            match coordinator.drain_pending_operations().await {
                Ok(_) => {}
                Err(err) if err.is_retryable() => {
                    tracing::warn!(target: "sync::drain", error = %err, "background drain failed")
                }
                Err(err) => {
                    tracing::error!(target: "sync::drain", error = %err, "background drain cannot run")
                }
            }
        });
    }

    /// Delivers pending operations one at a time, oldest first. A failed
    /// operation is recorded and skipped; it stays queued for the next drain.
    pub async fn drain_pending_operations(&self) -> Result<DrainReport, AppError> {
        if !self.is_online().await {
            return Ok(DrainReport::skipped(DrainOutcome::SkippedOffline));
        }
        let Ok(_drain) = self.drain_gate.try_lock() else {
            tracing::debug!(target: "sync::drain", "drain already in flight");
            return Ok(DrainReport::skipped(DrainOutcome::AlreadyDraining));
        };
        let _exclusive = self.exclusive.lock().await;
        let _state = StateGuard::enter(&self.state, SyncState::Draining);

        let mut queue: VecDeque<SyncOperation> = self.store.pending_operations().await?.into();
        let mut report = DrainReport::skipped(DrainOutcome::Completed);

        while let Some(operation) = queue.pop_front() {
            report.attempted += 1;
            let confirmed = match self.dispatch(&operation).await {
                Ok(confirmed) => confirmed,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: "sync::drain",
                        operation_id = %operation.id,
                        collection = %operation.collection(),
                        kind = %operation.kind(),
                        attempts = operation.attempts + 1,
                        retryable = err.is_retryable(),
                        error = %err,
                        "operation delivery failed"
                    );
                    if let Err(store_err) = self
                        .store
                        .record_operation_failure(&operation.id, &err.to_string())
                        .await
                    {
                        tracing::warn!(
                            target: "sync::drain",
                            operation_id = %operation.id,
                            error = %store_err,
                            "failed to record delivery failure"
                        );
                    }
                    continue;
                }
            };

            if let Err(err) = self
                .store
                .complete_operation(&operation, confirmed.as_ref())
                .await
            {
                // Delivered but not marked: the next drain replays it, which the
                // remote side absorbs.
                report.failed += 1;
                tracing::warn!(
                    target: "sync::drain",
                    operation_id = %operation.id,
                    error = %err,
                    "failed to mark operation synced"
                );
                continue;
            }
            report.synced += 1;

            if let Some(record) = &confirmed {
                if record.id() != operation.record_id() {
                    retarget_queued(&mut queue, operation.record_id(), record.id());
                }
            }
        }

        if report.synced > 0 {
            let cutoff = Utc::now() - self.settings.queue_retention;
            match self.store.purge_synced_operations(cutoff).await {
                Ok(0) => {}
                Ok(purged) => {
                    tracing::debug!(target: "sync::drain", purged, "compacted operation log")
                }
                Err(err) => {
                    tracing::warn!(target: "sync::drain", error = %err, "operation log compaction failed")
                }
            }
        }

        tracing::info!(
            target: "sync::drain",
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            "drain finished"
        );
        Ok(report)
    }

    /// Pulls every collection and merges it in: settled rows follow the server,
    /// unsettled rows keep their local state until their operations drain.
    pub async fn reconcile_from_server(&self) -> Result<ReconcileReport, AppError> {
        if !self.is_online().await {
            return Err(AppError::Offline);
        }
        let _exclusive = self.exclusive.lock().await;
        let _state = StateGuard::enter(&self.state, SyncState::ReconcilingFromServer);

        let mut report = ReconcileReport::default();
        for collection in Collection::ALL {
            self.reconcile_collection(collection, &mut report).await?;
        }

        tracing::info!(
            target: "sync::reconcile",
            inserted_or_updated = report.inserted_or_updated,
            kept_local = report.kept_local,
            removed = report.removed,
            failed = report.failed,
            "reconcile finished"
        );
        Ok(report)
    }

    async fn reconcile_collection(
        &self,
        collection: Collection,
        report: &mut ReconcileReport,
    ) -> Result<(), AppError> {
        let remote_records = self.remote.fetch_all(collection).await?;
        let remote_ids: HashSet<&RecordId> = remote_records.iter().map(Record::id).collect();

        for record in &remote_records {
            match self.store.apply_remote_record(record).await {
                Ok(true) => report.inserted_or_updated += 1,
                Ok(false) => report.kept_local += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: "sync::reconcile",
                        collection = %collection,
                        record_id = %record.id(),
                        error = %err,
                        "failed to apply remote record"
                    );
                }
            }
        }

        let local_records = self.store.all_records(collection).await?;
        for record in local_records {
            if !record.sync_status().is_settled() || remote_ids.contains(record.id()) {
                continue;
            }
            match self.store.remove_settled_record(collection, record.id()).await {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: "sync::reconcile",
                        collection = %collection,
                        record_id = %record.id(),
                        error = %err,
                        "failed to remove record deleted remotely"
                    );
                }
            }
        }
        Ok(())
    }

    /// Sends one operation. Returns the server's copy of the record when the
    /// remote call produces one.
    async fn dispatch(&self, operation: &SyncOperation) -> Result<Option<Record>, AppError> {
        match &operation.payload {
            OperationPayload::CreateCustomer { customer } => {
                let created = self
                    .remote
                    .create(&Record::Customer(customer.clone()))
                    .await?;
                Ok(Some(created))
            }
            OperationPayload::UpdateCustomer { id, patch } => {
                // Device-only changes have nothing to send.
                if !patch.touches_remote_fields() {
                    return Ok(None);
                }
                let updated = self
                    .remote
                    .update(id, &RecordPatch::Customer(patch.clone()))
                    .await?;
                Ok(Some(updated))
            }
            OperationPayload::DeleteCustomer { id } => {
                self.remote.remove(Collection::Customers, id).await?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ReachabilityListener for SyncCoordinator {
    async fn on_reachable(&self) {
        match self.drain_pending_operations().await {
            Ok(report) => tracing::debug!(
                target: "sync::drain",
                outcome = ?report.outcome,
                synced = report.synced,
                "drain after reconnect"
            ),
            Err(err) => {
                tracing::warn!(target: "sync::drain", error = %err, "drain after reconnect failed")
            }
        }
    }
}

fn retarget_queued(queue: &mut VecDeque<SyncOperation>, from: &RecordId, to: &RecordId) {
    for queued in queue.iter_mut() {
        if queued.record_id() == from {
            queued.payload.retarget(to.clone());
        }
    }
}
