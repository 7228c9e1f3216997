use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::{AnalyticsSnapshot, Record};
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

/// Dashboard figures computed from local customers, cached for `ttl`.
pub struct AnalyticsService {
    store: Arc<dyn LocalStore>,
    ttl: Duration,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn LocalStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn snapshot(&self, today: NaiveDate) -> Result<AnalyticsSnapshot, AppError> {
        if let Some(cached) = self.store.cached_snapshot(self.ttl).await? {
            return Ok(cached.snapshot);
        }
        self.refresh(today).await
    }

    pub async fn refresh(&self, today: NaiveDate) -> Result<AnalyticsSnapshot, AppError> {
        let customers: Vec<_> = self
            .store
            .all_records(Collection::Customers)
            .await?
            .into_iter()
            .filter_map(Record::into_customer)
            .collect();
        let snapshot = AnalyticsSnapshot::compute(&customers, today);

        if let Err(err) = self.store.cache_snapshot(&snapshot).await {
            tracing::warn!(target: "sync::store", error = %err, "failed to cache analytics snapshot");
        }
        Ok(snapshot)
    }
}
