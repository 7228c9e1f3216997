use crate::domain::entities::{Record, RecordPatch};
use crate::domain::value_objects::{Collection, RecordId};
use crate::shared::error::RemoteError;
use async_trait::async_trait;

/// Row-oriented access to the hosted backend. Implementations never retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every record the backend holds for `collection`, marked `synced`.
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Record>, RemoteError>;

    /// Inserts `record` and returns the row as stored remotely.
    async fn create(&self, record: &Record) -> Result<Record, RemoteError>;

    async fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<Record, RemoteError>;

    async fn remove(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError>;
}
