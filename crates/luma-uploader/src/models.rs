//! Upload configuration and result types

use crate::UploadError;

/// Default number of concurrent upload workers
pub const DEFAULT_WORKERS: usize = 4;

/// Encrypted sizes at or above this use multipart upload (20 MiB)
pub const DEFAULT_MULTIPART_MIN: u64 = 20 * 1024 * 1024;

/// Album used when the user does not name one
pub const DEFAULT_ALBUM_NAME: &str = "CLI Uploads";

/// Configuration for the upload orchestrator
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Number of concurrent upload workers
    pub workers: usize,
    /// Upload even when the hash is already known
    pub force_upload: bool,
    /// Create the album when it does not exist
    pub create_album: bool,
    /// Minimum encrypted size for multipart upload
    pub multipart_min: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            force_upload: false,
            create_album: false,
            multipart_min: DEFAULT_MULTIPART_MIN,
        }
    }
}

/// Outcome of one file's pipeline run
#[derive(Debug)]
pub struct UploadResult {
    pub file_name: String,
    pub success: bool,
    /// True when skipped because the hash was already uploaded
    pub skipped: bool,
    pub error: Option<UploadError>,
    pub file_id: i64,
    pub uploaded_bytes: i64,
}

impl UploadResult {
    pub fn failed(file_name: impl Into<String>, error: UploadError) -> Self {
        Self {
            file_name: file_name.into(),
            success: false,
            skipped: false,
            error: Some(error),
            file_id: 0,
            uploaded_bytes: 0,
        }
    }
}

/// Statistics for one upload session
#[derive(Debug, Default)]
pub struct UploadSummary {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub skipped_files: usize,
    pub total_bytes: i64,
    pub uploaded_bytes: i64,
    pub errors: Vec<UploadErrorEntry>,
}

/// A failed file with its reason, for the final error list
#[derive(Debug)]
pub struct UploadErrorEntry {
    pub file_name: String,
    pub error: String,
}
