use crate::application::ports::connectivity::{ConnectivityProbe, ReachabilityListener};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Last observed reachability of the backend. Starts out `Unknown` and is
/// treated as offline until the first probe completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    #[default]
    Unknown,
    Reachable,
    Unreachable,
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable)
    }
}

pub struct NetworkMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    poll_interval: Duration,
    status: RwLock<Reachability>,
}

impl NetworkMonitor {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, poll_interval: Duration) -> Self {
        Self {
            probe,
            poll_interval,
            status: RwLock::new(Reachability::Unknown),
        }
    }

    pub async fn reachability(&self) -> Reachability {
        *self.status.read().await
    }

    pub async fn current_status(&self) -> bool {
        self.reachability().await.is_reachable()
    }

    /// Probes once and records the result. Returns `true` on a rising edge.
    pub async fn poll_once(&self) -> bool {
        let next = if self.probe.check().await {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        };

        let previous = {
            let mut status = self.status.write().await;
            std::mem::replace(&mut *status, next)
        };

        if previous != next {
            tracing::info!(
                target: "sync::network",
                from = ?previous,
                to = ?next,
                "reachability changed"
            );
        }
        next.is_reachable() && !previous.is_reachable()
    }

    /// Starts the polling loop. Listeners run on their own task so a slow
    /// drain never delays the next probe. Abort the handle to stop polling.
    pub fn spawn(self: &Arc<Self>, listener: Arc<dyn ReachabilityListener>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if monitor.poll_once().await {
                    let listener = Arc::clone(&listener);
                    tokio::spawn(async move {
                        listener.on_reachable().await;
                    });
                }
            }
        })
    }
}
