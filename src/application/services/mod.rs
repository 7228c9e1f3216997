pub mod analytics_service;
pub mod network_monitor;
pub mod sync_coordinator;

pub use analytics_service::AnalyticsService;
pub use network_monitor::{NetworkMonitor, Reachability};
pub use sync_coordinator::{
    CoordinatorSettings, DrainOutcome, DrainReport, ReconcileReport, SyncCoordinator, SyncState,
};
