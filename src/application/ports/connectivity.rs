use async_trait::async_trait;

/// One reachability check against the backend.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Notified when the backend becomes reachable after not being reachable.
#[async_trait]
pub trait ReachabilityListener: Send + Sync {
    async fn on_reachable(&self);
}
