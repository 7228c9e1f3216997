use thiserror::Error;

/// Failures raised by the remote table backend. The client never retries; the
/// coordinator decides what to do with them.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned no row for {0}")]
    MissingRow(String),

    #[error("malformed backend response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    /// The embedded database could not be opened or migrated.
    #[error("Storage init error: {0}")]
    StorageInit(String),

    /// A store operation ran before `initialize()`.
    #[error("Local store used before initialize()")]
    NotInitialized,

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Storage read error: {0}")]
    StorageRead(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Cannot sync from server while offline")]
    Offline,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    pub fn storage_write(err: impl std::fmt::Display) -> Self {
        AppError::StorageWrite(err.to_string())
    }

    pub fn storage_read(err: impl std::fmt::Display) -> Self {
        AppError::StorageRead(err.to_string())
    }

    /// Errors the caller may retry without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StorageWrite(_)
                | AppError::StorageRead(_)
                | AppError::Remote(_)
                | AppError::Offline
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StorageInit(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
