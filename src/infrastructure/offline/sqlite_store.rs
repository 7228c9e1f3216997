use super::mappers::{
    customer_from_row, customer_to_row, operation_from_row, snapshot_from_row,
};
use super::rows::{AnalyticsCacheRow, CustomerRow, SyncQueueRow};
use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::{
    AnalyticsSnapshot, CachedSnapshot, Customer, OperationPayload, Record, SyncOperation,
};
use crate::domain::value_objects::{
    Collection, OperationId, OperationKind, RecordId, SyncStatus,
};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::OnceCell;

const SELECT_CUSTOMERS: &str = r#"
    SELECT id, name, mobile, visit_date, services, payment_amount, birthday, notes,
           photo_uri, created_at, updated_at, sync_status
    FROM customers
    ORDER BY created_at DESC, id ASC
"#;

const SELECT_CUSTOMER_BY_ID: &str = r#"
    SELECT id, name, mobile, visit_date, services, payment_amount, birthday, notes,
           photo_uri, created_at, updated_at, sync_status
    FROM customers
    WHERE id = ?1
"#;

const UPSERT_CUSTOMER: &str = r#"
    INSERT INTO customers (
        id, name, mobile, visit_date, services, payment_amount, birthday, notes,
        photo_uri, created_at, updated_at, sync_status
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        mobile = excluded.mobile,
        visit_date = excluded.visit_date,
        services = excluded.services,
        payment_amount = excluded.payment_amount,
        birthday = excluded.birthday,
        notes = excluded.notes,
        photo_uri = excluded.photo_uri,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at,
        sync_status = excluded.sync_status
"#;

// Server rows never carry photo_uri, so the device-local value is left alone.
// Records with queued operations keep their local state, including local
// deletes that have not reached the server yet.
const APPLY_REMOTE_CUSTOMER: &str = r#"
    INSERT INTO customers (
        id, name, mobile, visit_date, services, payment_amount, birthday, notes,
        photo_uri, created_at, updated_at, sync_status
    )
    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'synced'
    WHERE NOT EXISTS (
        SELECT 1 FROM sync_queue
        WHERE synced = 0 AND table_name = 'customers' AND record_id = ?1
    )
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        mobile = excluded.mobile,
        visit_date = excluded.visit_date,
        services = excluded.services,
        payment_amount = excluded.payment_amount,
        birthday = excluded.birthday,
        notes = excluded.notes,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at,
        sync_status = 'synced'
    WHERE customers.sync_status = 'synced'
"#;

const INSERT_OPERATION: &str = r#"
    INSERT INTO sync_queue (
        id, table_name, operation, record_id, payload, enqueued_at,
        synced, synced_at, attempts, last_error
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(id) DO NOTHING
"#;

const SELECT_PENDING_OPERATIONS: &str = r#"
    SELECT seq, id, table_name, operation, record_id, payload, enqueued_at,
           synced, synced_at, attempts, last_error
    FROM sync_queue
    WHERE synced = 0
    ORDER BY enqueued_at ASC, seq ASC
"#;

const SELECT_PENDING_FOR_RECORD: &str = r#"
    SELECT seq, id, table_name, operation, record_id, payload, enqueued_at,
           synced, synced_at, attempts, last_error
    FROM sync_queue
    WHERE synced = 0 AND table_name = ?1 AND record_id = ?2
    ORDER BY enqueued_at ASC, seq ASC
"#;

const MARK_SYNCED: &str = r#"
    UPDATE sync_queue
    SET synced = 1, synced_at = COALESCE(synced_at, ?2)
    WHERE id = ?1
"#;

/// SQLite-backed [`LocalStore`]. The pool is opened lazily by `initialize`.
pub struct SqliteLocalStore {
    database_url: String,
    max_connections: u32,
    pool: OnceCell<ConnectionPool>,
}

impl SqliteLocalStore {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
            pool: OnceCell::new(),
        }
    }

    /// A private database that lives as long as the store.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:", 1)
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }

    fn pool(&self) -> Result<&SqlitePool, AppError> {
        self.pool
            .get()
            .map(ConnectionPool::get_pool)
            .ok_or(AppError::NotInitialized)
    }

    async fn open(&self) -> Result<ConnectionPool, AppError> {
        let pool = ConnectionPool::new(&self.database_url, self.max_connections)
            .await
            .map_err(|err| AppError::StorageInit(err.to_string()))?;
        pool.migrate().await?;
        tracing::info!(target: "sync::store", url = %self.database_url, "local store ready");
        Ok(pool)
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn initialize(&self) -> Result<(), AppError> {
        self.pool.get_or_try_init(|| self.open()).await?;
        Ok(())
    }

    async fn all_records(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        let pool = self.pool()?;
        match collection {
            Collection::Customers => {
                let rows = sqlx::query_as::<_, CustomerRow>(SELECT_CUSTOMERS)
                    .fetch_all(pool)
                    .await
                    .map_err(AppError::storage_read)?;
                rows.into_iter()
                    .map(|row| customer_from_row(row).map(Record::Customer))
                    .collect()
            }
        }
    }

    async fn upsert_record(&self, record: &Record) -> Result<(), AppError> {
        let pool = self.pool()?;
        let mut conn = pool.acquire().await.map_err(AppError::storage_write)?;
        write_record(&mut conn, record).await
    }

    async fn delete_record(&self, collection: Collection, id: &RecordId) -> Result<(), AppError> {
        let pool = self.pool()?;
        let mut conn = pool.acquire().await.map_err(AppError::storage_write)?;
        delete_row(&mut conn, collection, id)
            .await
            .map_err(AppError::storage_write)?;
        Ok(())
    }

    async fn enqueue_operation(&self, operation: &SyncOperation) -> Result<(), AppError> {
        let pool = self.pool()?;
        let payload = serde_json::to_string(&operation.payload)?;
        let mut conn = pool.acquire().await.map_err(AppError::storage_write)?;
        insert_operation(&mut conn, operation, &payload)
            .await
            .map_err(AppError::storage_write)
    }

    async fn stage_operation(&self, operation: &SyncOperation) -> Result<(), AppError> {
        let pool = self.pool()?;
        let payload = serde_json::to_string(&operation.payload)?;
        let mut tx = pool.begin().await.map_err(AppError::storage_write)?;

        match &operation.payload {
            OperationPayload::CreateCustomer { customer } => {
                let staged = Customer {
                    sync_status: SyncStatus::Pending,
                    ..customer.clone()
                };
                write_customer(&mut tx, &customer_to_row(&staged)?)
                    .await
                    .map_err(AppError::storage_write)?;
            }
            OperationPayload::UpdateCustomer { id, patch } => {
                let existing = fetch_customer(&mut tx, id)
                    .await
                    .map_err(AppError::storage_write)?;
                match existing {
                    Some(row) => {
                        let mut customer = customer_from_row(row)?;
                        patch.apply_to(&mut customer, operation.enqueued_at);
                        customer.sync_status = SyncStatus::Pending;
                        write_customer(&mut tx, &customer_to_row(&customer)?)
                            .await
                            .map_err(AppError::storage_write)?;
                    }
                    None => {
                        tracing::debug!(
                            target: "sync::store",
                            record_id = %id,
                            "no local row to patch, queueing update only"
                        );
                    }
                }
            }
            OperationPayload::DeleteCustomer { id } => {
                delete_row(&mut tx, Collection::Customers, id)
                    .await
                    .map_err(AppError::storage_write)?;
            }
        }

        insert_operation(&mut tx, operation, &payload)
            .await
            .map_err(AppError::storage_write)?;
        tx.commit().await.map_err(AppError::storage_write)?;

        tracing::debug!(
            target: "sync::store",
            operation_id = %operation.id,
            collection = %operation.collection(),
            kind = %operation.kind(),
            "operation staged"
        );
        Ok(())
    }

    async fn pending_operations(&self) -> Result<Vec<SyncOperation>, AppError> {
        let pool = self.pool()?;
        let rows = sqlx::query_as::<_, SyncQueueRow>(SELECT_PENDING_OPERATIONS)
            .fetch_all(pool)
            .await
            .map_err(AppError::storage_read)?;
        rows.into_iter().map(operation_from_row).collect()
    }

    async fn mark_operation_synced(&self, id: &OperationId) -> Result<(), AppError> {
        let pool = self.pool()?;
        sqlx::query(MARK_SYNCED)
            .bind(id.as_str())
            .bind(Utc::now().timestamp_millis())
            .execute(pool)
            .await
            .map_err(AppError::storage_write)?;
        Ok(())
    }

    async fn complete_operation(
        &self,
        operation: &SyncOperation,
        confirmed: Option<&Record>,
    ) -> Result<(), AppError> {
        let pool = self.pool()?;
        let collection = operation.collection();
        let mut tx = pool.begin().await.map_err(AppError::storage_write)?;

        sqlx::query(MARK_SYNCED)
            .bind(operation.id.as_str())
            .bind(Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await
            .map_err(AppError::storage_write)?;

        let mut target = operation.record_id().clone();
        if let Some(record) = confirmed {
            if record.id() != operation.record_id() {
                retarget_record(&mut tx, collection, operation.record_id(), record.id()).await?;
                target = record.id().clone();
            }
        }

        let still_pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sync_queue WHERE synced = 0 AND table_name = ?1 AND record_id = ?2",
        )
        .bind(collection.table_name())
        .bind(target.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::storage_write)?;

        if still_pending == 0 && operation.kind() == OperationKind::Delete {
            delete_row(&mut tx, collection, &target)
                .await
                .map_err(AppError::storage_write)?;
        } else if still_pending == 0 {
            match confirmed {
                Some(Record::Customer(remote)) => {
                    let local = fetch_customer(&mut tx, &target)
                        .await
                        .map_err(AppError::storage_write)?;
                    // Only rows that still exist locally are settled.
                    if let Some(local) = local {
                        let settled = Customer {
                            photo_uri: remote.photo_uri.clone().or(local.photo_uri),
                            sync_status: SyncStatus::Synced,
                            ..remote.clone()
                        };
                        write_customer(&mut tx, &customer_to_row(&settled)?)
                            .await
                            .map_err(AppError::storage_write)?;
                    }
                }
                None => {
                    sqlx::query("UPDATE customers SET sync_status = 'synced' WHERE id = ?1")
                        .bind(target.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(AppError::storage_write)?;
                }
            }
        }

        tx.commit().await.map_err(AppError::storage_write)?;
        tracing::debug!(
            target: "sync::store",
            operation_id = %operation.id,
            record_id = %target,
            still_pending,
            "operation completed"
        );
        Ok(())
    }

    async fn record_operation_failure(
        &self,
        id: &OperationId,
        error: &str,
    ) -> Result<(), AppError> {
        let pool = self.pool()?;
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET attempts = attempts + 1, last_error = ?2
            WHERE id = ?1 AND synced = 0
            "#,
        )
        .bind(id.as_str())
        .bind(error)
        .execute(pool)
        .await
        .map_err(AppError::storage_write)?;
        Ok(())
    }

    async fn apply_remote_record(&self, record: &Record) -> Result<bool, AppError> {
        let pool = self.pool()?;
        let result = match record {
            Record::Customer(customer) => {
                let row = customer_to_row(customer)?;
                bind_customer(sqlx::query(APPLY_REMOTE_CUSTOMER), &row)
                    .execute(pool)
                    .await
                    .map_err(AppError::storage_write)?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn remove_settled_record(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<bool, AppError> {
        let pool = self.pool()?;
        let result = match collection {
            Collection::Customers => {
                sqlx::query("DELETE FROM customers WHERE id = ?1 AND sync_status = 'synced'")
                    .bind(id.as_str())
                    .execute(pool)
                    .await
                    .map_err(AppError::storage_write)?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn purge_synced_operations(&self, before: DateTime<Utc>) -> Result<u64, AppError> {
        let pool = self.pool()?;
        let result = sqlx::query("DELETE FROM sync_queue WHERE synced = 1 AND synced_at < ?1")
            .bind(before.timestamp_millis())
            .execute(pool)
            .await
            .map_err(AppError::storage_write)?;
        Ok(result.rows_affected())
    }

    async fn cache_snapshot(&self, snapshot: &AnalyticsSnapshot) -> Result<(), AppError> {
        let pool = self.pool()?;
        let payload = serde_json::to_string(snapshot)?;
        sqlx::query(
            r#"
            INSERT INTO analytics_cache (id, payload, cached_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(payload)
        .bind(Utc::now().timestamp_millis())
        .execute(pool)
        .await
        .map_err(AppError::storage_write)?;
        Ok(())
    }

    async fn cached_snapshot(
        &self,
        max_age: Duration,
    ) -> Result<Option<CachedSnapshot>, AppError> {
        let pool = self.pool()?;
        let row = sqlx::query_as::<_, AnalyticsCacheRow>(
            "SELECT payload, cached_at FROM analytics_cache WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
        .map_err(AppError::storage_read)?;

        let Some(row) = row else {
            return Ok(None);
        };
        match snapshot_from_row(row) {
            Ok(cached) if cached.is_fresh(max_age, Utc::now()) => Ok(Some(cached)),
            Ok(_) => Ok(None),
            Err(err) => {
                tracing::warn!(
                    target: "sync::store",
                    error = %err,
                    "discarding unreadable analytics cache entry"
                );
                Ok(None)
            }
        }
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_customer<'q>(query: SqliteQuery<'q>, row: &'q CustomerRow) -> SqliteQuery<'q> {
    query
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.mobile)
        .bind(&row.visit_date)
        .bind(&row.services)
        .bind(row.payment_amount)
        .bind(&row.birthday)
        .bind(&row.notes)
        .bind(&row.photo_uri)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(&row.sync_status)
}

async fn write_customer(conn: &mut SqliteConnection, row: &CustomerRow) -> Result<(), sqlx::Error> {
    bind_customer(sqlx::query(UPSERT_CUSTOMER), row)
        .execute(conn)
        .await?;
    Ok(())
}

async fn write_record(conn: &mut SqliteConnection, record: &Record) -> Result<(), AppError> {
    match record {
        Record::Customer(customer) => {
            let row = customer_to_row(customer)?;
            write_customer(conn, &row)
                .await
                .map_err(AppError::storage_write)
        }
    }
}

async fn fetch_customer(
    conn: &mut SqliteConnection,
    id: &RecordId,
) -> Result<Option<CustomerRow>, sqlx::Error> {
    sqlx::query_as::<_, CustomerRow>(SELECT_CUSTOMER_BY_ID)
        .bind(id.as_str())
        .fetch_optional(conn)
        .await
}

async fn delete_row(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: &RecordId,
) -> Result<u64, sqlx::Error> {
    let result = match collection {
        Collection::Customers => {
            sqlx::query("DELETE FROM customers WHERE id = ?1")
                .bind(id.as_str())
                .execute(conn)
                .await?
        }
    };
    Ok(result.rows_affected())
}

async fn insert_operation(
    conn: &mut SqliteConnection,
    operation: &SyncOperation,
    payload: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_OPERATION)
        .bind(operation.id.as_str())
        .bind(operation.collection().table_name())
        .bind(operation.kind().as_str())
        .bind(operation.record_id().as_str())
        .bind(payload)
        .bind(operation.enqueued_at.timestamp_millis())
        .bind(operation.synced)
        .bind(operation.synced_at.map(|ts| ts.timestamp_millis()))
        .bind(i64::from(operation.attempts))
        .bind(&operation.last_error)
        .execute(conn)
        .await?;
    Ok(())
}

/// Moves a local row to a server-assigned id and points every pending
/// operation on the old id at the new one.
async fn retarget_record(
    conn: &mut SqliteConnection,
    collection: Collection,
    from: &RecordId,
    to: &RecordId,
) -> Result<(), AppError> {
    match collection {
        Collection::Customers => {
            sqlx::query("DELETE FROM customers WHERE id = ?1")
                .bind(to.as_str())
                .execute(&mut *conn)
                .await
                .map_err(AppError::storage_write)?;
            sqlx::query("UPDATE customers SET id = ?2 WHERE id = ?1")
                .bind(from.as_str())
                .bind(to.as_str())
                .execute(&mut *conn)
                .await
                .map_err(AppError::storage_write)?;
        }
    }

    let rows = sqlx::query_as::<_, SyncQueueRow>(SELECT_PENDING_FOR_RECORD)
        .bind(collection.table_name())
        .bind(from.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(AppError::storage_write)?;

    for row in rows {
        let mut pending = operation_from_row(row)?;
        pending.payload.retarget(to.clone());
        let payload = serde_json::to_string(&pending.payload)?;
        sqlx::query("UPDATE sync_queue SET record_id = ?2, payload = ?3 WHERE id = ?1")
            .bind(pending.id.as_str())
            .bind(to.as_str())
            .bind(payload)
            .execute(&mut *conn)
            .await
            .map_err(AppError::storage_write)?;
    }

    tracing::info!(
        target: "sync::store",
        from = %from,
        to = %to,
        "record re-keyed to server id"
    );
    Ok(())
}
