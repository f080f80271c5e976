//! Error types for the nucleus deployment core

use thiserror::Error;

/// Main error type for the deployment core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The remote call exceeded its deadline. The remote side may still have
    /// completed the operation; callers must treat this as an unknown outcome.
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The remote answered with a non-success status.
    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("Malformed remote response: {0}")]
    MalformedResponse(String),

    /// A checksum or encoding check failed. Never downgraded to a warning.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Backup error: {0}")]
    BackupError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl CoreError {
    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Timeout(_) | CoreError::ConnectionError(_))
    }
}
