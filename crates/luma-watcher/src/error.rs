//! Watcher error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors from the watcher and its duplicate handling
#[derive(Error, Debug)]
pub enum WatchError {
    /// Filesystem subscription failure
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),

    /// Failure inside the upload pipeline
    #[error(transparent)]
    Upload(#[from] luma_uploader::UploadError),

    /// Key-value store failure
    #[error("state store error: {0}")]
    State(#[from] luma_store::StoreError),

    /// Encryption or key wrapping failure
    #[error("encryption failed: {0}")]
    Crypto(#[from] luma_crypto::CryptoError),

    /// Control-plane request failure
    #[error(transparent)]
    Api(#[from] luma_api::ApiError),
}
