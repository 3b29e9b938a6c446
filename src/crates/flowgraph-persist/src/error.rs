//! Error types for snapshot persistence

use thiserror::Error;

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistError>;

/// Errors that can occur while saving, loading or deleting snapshots
#[derive(Error, Debug)]
pub enum PersistError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid snapshot or workflow identifier
    #[error("Invalid snapshot: {0}")]
    Invalid(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQL error from the relational backend
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PersistError {
    /// Create a storage error with context
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an invalid-input error with context
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
