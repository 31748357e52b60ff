//! Error types for the state store

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the embedded key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database error
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored record could not be decoded
    #[error("corrupt record in bucket {bucket}: {reason}")]
    CorruptRecord { bucket: &'static str, reason: String },

    /// Record could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
