use super::rows::{AnalyticsCacheRow, CustomerRow, SyncQueueRow};
use crate::domain::entities::{AnalyticsSnapshot, CachedSnapshot, Customer, SyncOperation};
use crate::domain::value_objects::{Collection, OperationId, OperationKind, RecordId, SyncStatus};
use crate::shared::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn customer_to_row(customer: &Customer) -> Result<CustomerRow, AppError> {
    Ok(CustomerRow {
        id: customer.id.as_str().to_string(),
        name: customer.name.clone(),
        mobile: customer.mobile.clone(),
        visit_date: customer.visit_date.format(DATE_FORMAT).to_string(),
        services: serde_json::to_string(&customer.services)?,
        payment_amount: customer.payment_amount,
        birthday: customer
            .birthday
            .map(|date| date.format(DATE_FORMAT).to_string()),
        notes: customer.notes.clone(),
        photo_uri: customer.photo_uri.clone(),
        created_at: customer.created_at.timestamp_millis(),
        updated_at: customer.updated_at.map(|ts| ts.timestamp_millis()),
        sync_status: customer.sync_status.as_str().to_string(),
    })
}

pub fn customer_from_row(row: CustomerRow) -> Result<Customer, AppError> {
    let services: Vec<String> = serde_json::from_str(&row.services)
        .map_err(|err| AppError::storage_read(format!("customer {}: services: {err}", row.id)))?;
    let sync_status = SyncStatus::try_from(row.sync_status.as_str())
        .map_err(|err| AppError::storage_read(format!("customer {}: {err}", row.id)))?;

    Ok(Customer {
        id: RecordId::new(row.id).map_err(AppError::StorageRead)?,
        name: row.name,
        mobile: row.mobile,
        visit_date: parse_date(&row.visit_date)?,
        services,
        payment_amount: row.payment_amount,
        birthday: row.birthday.as_deref().map(parse_date).transpose()?,
        notes: row.notes,
        photo_uri: row.photo_uri,
        created_at: millis_to_datetime(row.created_at)?,
        updated_at: row.updated_at.map(millis_to_datetime).transpose()?,
        sync_status,
    })
}

pub fn operation_from_row(row: SyncQueueRow) -> Result<SyncOperation, AppError> {
    let payload = serde_json::from_str(&row.payload).map_err(|err| {
        AppError::storage_read(format!("operation {} (seq {}): {err}", row.id, row.seq))
    })?;
    let operation = SyncOperation {
        id: OperationId::new(row.id).map_err(AppError::StorageRead)?,
        payload,
        enqueued_at: millis_to_datetime(row.enqueued_at)?,
        synced: row.synced,
        synced_at: row.synced_at.map(millis_to_datetime).transpose()?,
        attempts: u32::try_from(row.attempts).unwrap_or(u32::MAX),
        last_error: row.last_error,
    };

    // The indexed columns must agree with the payload they were derived from.
    let collection = Collection::try_from(row.table_name.as_str()).map_err(AppError::StorageRead)?;
    let kind = OperationKind::try_from(row.operation.as_str()).map_err(AppError::StorageRead)?;
    if collection != operation.collection()
        || kind != operation.kind()
        || row.record_id != operation.record_id().as_str()
    {
        return Err(AppError::storage_read(format!(
            "operation {} columns disagree with its payload",
            operation.id
        )));
    }

    Ok(operation)
}

pub fn snapshot_from_row(row: AnalyticsCacheRow) -> Result<CachedSnapshot, AppError> {
    let snapshot: AnalyticsSnapshot = serde_json::from_str(&row.payload)?;
    Ok(CachedSnapshot {
        snapshot,
        cached_at: millis_to_datetime(row.cached_at)?,
    })
}

pub fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::storage_read(format!("timestamp out of range: {ms}")))
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| AppError::storage_read(format!("invalid date `{value}`: {err}")))
}
