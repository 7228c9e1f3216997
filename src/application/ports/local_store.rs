use crate::domain::entities::{AnalyticsSnapshot, CachedSnapshot, Record, SyncOperation};
use crate::domain::value_objects::{Collection, OperationId, RecordId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Durable on-device storage for mirrored records, the operation log and the
/// analytics cache. Every call either fully applies or leaves prior state as it was.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Opens the backing database and creates its tables. Calling it again is a no-op.
    async fn initialize(&self) -> Result<(), AppError>;

    /// Records of a collection, newest-created first.
    async fn all_records(&self, collection: Collection) -> Result<Vec<Record>, AppError>;

    async fn upsert_record(&self, record: &Record) -> Result<(), AppError>;

    async fn delete_record(&self, collection: Collection, id: &RecordId) -> Result<(), AppError>;

    async fn enqueue_operation(&self, operation: &SyncOperation) -> Result<(), AppError>;

    /// Applies the optimistic local write for `operation` and appends it to the
    /// log in a single transaction.
    async fn stage_operation(&self, operation: &SyncOperation) -> Result<(), AppError>;

    /// Unsynced operations, oldest enqueue first.
    async fn pending_operations(&self) -> Result<Vec<SyncOperation>, AppError>;

    async fn mark_operation_synced(&self, id: &OperationId) -> Result<(), AppError>;

    /// Marks `operation` synced and settles its record against the version the
    /// remote store confirmed. `None` settles the local row as it stands.
    async fn complete_operation(
        &self,
        operation: &SyncOperation,
        confirmed: Option<&Record>,
    ) -> Result<(), AppError>;

    async fn record_operation_failure(
        &self,
        id: &OperationId,
        error: &str,
    ) -> Result<(), AppError>;

    /// Writes a server record unless the local copy holds unsynced changes.
    /// Returns whether the local row changed.
    async fn apply_remote_record(&self, record: &Record) -> Result<bool, AppError>;

    /// Deletes the local row only when it is settled. Returns whether a row went away.
    async fn remove_settled_record(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<bool, AppError>;

    /// Drops confirmed operations synced before `before`. Returns how many.
    async fn purge_synced_operations(&self, before: DateTime<Utc>) -> Result<u64, AppError>;

    async fn cache_snapshot(&self, snapshot: &AnalyticsSnapshot) -> Result<(), AppError>;

    /// The cached snapshot, or `None` when absent or older than `max_age`.
    async fn cached_snapshot(&self, max_age: Duration)
        -> Result<Option<CachedSnapshot>, AppError>;
}
