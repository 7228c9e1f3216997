use async_trait::async_trait;
use barberpro_sync::application::ports::remote_store::RemoteStore;
use barberpro_sync::domain::entities::{Record, RecordPatch};
use barberpro_sync::domain::value_objects::{Collection, RecordId, SyncStatus};
use barberpro_sync::RemoteError;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    FetchAll(Collection),
    Create(String),
    Update(String),
    Remove(String),
}

/// In-memory stand-in for the hosted backend. Records every call and can be
/// told to fail calls for particular record ids.
#[derive(Default)]
pub struct MockRemoteStore {
    rows: Mutex<BTreeMap<String, Record>>,
    calls: Mutex<Vec<RemoteCall>>,
    failing_ids: Mutex<HashSet<String>>,
    fail_fetch: AtomicBool,
    assign_ids: AtomicBool,
    next_id: AtomicU32,
    latency: Mutex<Option<Duration>>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server picks its own ids for created rows.
    pub fn assigning_ids() -> Self {
        let store = Self::default();
        store.assign_ids.store(true, Ordering::SeqCst);
        store
    }

    pub fn seed(&self, record: Record) {
        let record = record.with_sync_status(SyncStatus::Synced);
        self.rows
            .lock()
            .unwrap()
            .insert(record.id().to_string(), record);
    }

    pub fn row(&self, id: &str) -> Option<Record> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, RemoteCall::FetchAll(_)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_for(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.failing_ids.lock().unwrap().remove(id);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    async fn enter(&self, call: RemoteCall, id: Option<&str>) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(id) = id {
            if self.failing_ids.lock().unwrap().contains(id) {
                return Err(RemoteError::Status {
                    status: 503,
                    body: format!("unavailable for {id}"),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Record>, RemoteError> {
        self.enter(RemoteCall::FetchAll(collection), None).await?;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 500,
                body: "fetch failed".to_string(),
            });
        }
        let mut records: Vec<Record> = self.rows.lock().unwrap().values().cloned().collect();
        records.sort_by_key(|record| std::cmp::Reverse(record.created_at()));
        Ok(records)
    }

    async fn create(&self, record: &Record) -> Result<Record, RemoteError> {
        let id = record.id().to_string();
        self.enter(RemoteCall::Create(id.clone()), Some(&id)).await?;

        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.get(&id) {
            return Ok(existing.clone());
        }
        let Record::Customer(customer) = record.clone();
        let mut stored = customer;
        if self.assign_ids.load(Ordering::SeqCst) {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            stored.id = RecordId::new(format!("srv-{n}")).unwrap();
        }
        stored.photo_uri = None;
        stored.updated_at = Some(Utc::now());
        stored.sync_status = SyncStatus::Synced;
        let stored = Record::Customer(stored);
        rows.insert(stored.id().to_string(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<Record, RemoteError> {
        self.enter(RemoteCall::Update(id.to_string()), Some(id.as_str()))
            .await?;

        let mut rows = self.rows.lock().unwrap();
        let Some(Record::Customer(customer)) = rows.get_mut(id.as_str()) else {
            return Err(RemoteError::MissingRow(format!("customers/{id}")));
        };
        let RecordPatch::Customer(patch) = patch;
        let mut remote_patch = patch.clone();
        remote_patch.photo_uri = None;
        remote_patch.apply_to(customer, Utc::now());
        Ok(Record::Customer(customer.clone()))
    }

    async fn remove(&self, _collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::Remove(id.to_string()), Some(id.as_str()))
            .await?;
        self.rows.lock().unwrap().remove(id.as_str());
        Ok(())
    }
}
