//! Error types shared by the storage backends and the error coordination layer

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a secure storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(String),

    /// Migration failure while opening the store
    #[error("Migration error: {0}")]
    Migration(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage call did not complete in time
    #[error("Storage operation on '{key}' timed out after {elapsed:?}")]
    Timeout { key: String, elapsed: Duration },

    /// Filesystem failure while preparing the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Failure signals produced by remote operations.
///
/// `ErrorStore::with_error_handling` looks for this type anywhere in an
/// `anyhow` error chain to decide how a failure is classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request never reached the server
    #[error("Network Error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Network(_) => None,
            RequestError::Status { status, .. } => Some(*status),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
