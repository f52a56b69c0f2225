use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid sample: {0}")]
    InvalidSample(String),
    #[error("Invalid time token: {0:?}")]
    InvalidTimeToken(String),
    #[error("DB error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
