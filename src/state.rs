use crate::application::ports::connectivity::{ConnectivityProbe, ReachabilityListener};
use crate::application::ports::local_store::LocalStore;
use crate::application::ports::remote_store::RemoteStore;
use crate::application::services::{
    AnalyticsService, CoordinatorSettings, NetworkMonitor, ReconcileReport, SyncCoordinator,
};
use crate::domain::entities::{AnalyticsSnapshot, OperationPayload, Record, SyncOperation};
use crate::domain::value_objects::Collection;
use crate::infrastructure::network::HttpConnectivityProbe;
use crate::infrastructure::offline::SqliteLocalStore;
use crate::infrastructure::remote::PostgrestRemoteStore;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Process-wide context. Built once at startup and handed to every consumer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub local_store: Arc<SqliteLocalStore>,
    pub network_monitor: Arc<NetworkMonitor>,
    pub sync_coordinator: Arc<SyncCoordinator>,
    pub analytics: Arc<AnalyticsService>,
    monitor_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppState {
    pub async fn initialize(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;
        ensure_database_dir(&config.database.url)?;

        let store = Arc::new(SqliteLocalStore::new(
            config.database.url.clone(),
            config.database.max_connections,
        ));
        let remote = Arc::new(PostgrestRemoteStore::new(&config.remote)?);
        let probe = Arc::new(HttpConnectivityProbe::from_config(&config)?);

        Self::assemble(config, store, remote, probe).await
    }

    /// Wires the components around an already chosen store, backend and probe.
    pub async fn assemble(
        config: AppConfig,
        store: Arc<SqliteLocalStore>,
        remote: Arc<dyn RemoteStore>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self, AppError> {
        store.initialize().await?;

        let network_monitor = Arc::new(NetworkMonitor::new(probe, config.poll_interval()));
        let sync_coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            remote,
            network_monitor.clone(),
            CoordinatorSettings::from(&config),
        ));
        let analytics = Arc::new(AnalyticsService::new(store.clone(), config.analytics_ttl()));

        Ok(Self {
            config: Arc::new(config),
            local_store: store,
            network_monitor,
            sync_coordinator,
            analytics,
            monitor_task: Arc::new(Mutex::new(None)),
        })
    }

    /// Starts the reachability loop. A second call while running is a no-op.
    pub fn start(&self) {
        let mut task = self
            .monitor_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }
        let listener: Arc<dyn ReachabilityListener> = self.sync_coordinator.clone();
        *task = Some(self.network_monitor.spawn(listener));
        tracing::info!(
            target: "sync::network",
            interval_secs = self.config.network.poll_interval_secs,
            "network monitor started"
        );
    }

    pub async fn shutdown(&self) {
        let task = self
            .monitor_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.local_store.close().await;
        tracing::info!("sync core shut down");
    }

    pub async fn queue_operation(
        &self,
        payload: OperationPayload,
    ) -> Result<SyncOperation, AppError> {
        self.sync_coordinator.queue_operation(payload).await
    }

    pub async fn records(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        self.local_store.all_records(collection).await
    }

    pub async fn is_online(&self) -> bool {
        self.sync_coordinator.is_online().await
    }

    pub async fn reconcile_from_server(&self) -> Result<ReconcileReport, AppError> {
        self.sync_coordinator.reconcile_from_server().await
    }

    pub async fn analytics(&self, today: NaiveDate) -> Result<AnalyticsSnapshot, AppError> {
        self.analytics.snapshot(today).await
    }
}

fn ensure_database_dir(url: &str) -> Result<(), AppError> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|err| AppError::StorageInit(format!("{}: {err}", dir.display()))),
        _ => Ok(()),
    }
}
