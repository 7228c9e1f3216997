use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub id: String,
    pub name: String,
    pub mobile: String,
    pub visit_date: String,
    pub services: String,
    pub payment_amount: f64,
    pub birthday: Option<String>,
    pub notes: Option<String>,
    pub photo_uri: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub sync_status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncQueueRow {
    pub seq: i64,
    pub id: String,
    pub table_name: String,
    pub operation: String,
    pub record_id: String,
    pub payload: String,
    pub enqueued_at: i64,
    pub synced: bool,
    pub synced_at: Option<i64>,
    pub attempts: i64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AnalyticsCacheRow {
    pub payload: String,
    pub cached_at: i64,
}
