//! Upload pipeline errors
//!
//! One variant per failure class. Per-file errors are contained by the
//! orchestrator: they land in the summary and the pipeline moves on.
//! Album-resolution failures abort the batch because every file needs the
//! same album.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors from the upload pipeline
#[derive(Error, Debug)]
pub enum UploadError {
    /// File failed validation (missing, unreadable, unsupported extension)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Content hashing failed
    #[error("failed to compute hash: {0}")]
    Hash(String),

    /// Metadata extraction failed
    #[error("failed to extract metadata: {0}")]
    Metadata(String),

    /// Thumbnail generation failed (missing tool or non-zero exit)
    #[error("failed to generate thumbnail: {0}")]
    Thumbnail(String),

    /// Encryption or key wrapping failed
    #[error("encryption failed: {0}")]
    Encryption(#[from] luma_crypto::CryptoError),

    /// Album lookup failed and creation was not requested
    #[error("album '{0}' not found")]
    AlbumNotFound(String),

    /// Control-plane request failed (transport or non-2xx)
    #[error(transparent)]
    Api(#[from] luma_api::ApiError),

    /// Object-store PUT/POST returned a non-200 response
    #[error("s3 upload failed with status {status}: {body}")]
    S3 { status: u16, body: String },

    /// Object-store request failed at the transport level
    #[error("s3 transport error: {0}")]
    S3Transport(#[from] reqwest::Error),

    /// Key-value store failure
    #[error("state store error: {0}")]
    State(#[from] luma_store::StoreError),

    /// The file is already in the catalog
    #[error("file already uploaded (id {0})")]
    AlreadyUploaded(i64),

    /// Local IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation aborted by shutdown
    #[error("cancelled")]
    Cancelled,
}
