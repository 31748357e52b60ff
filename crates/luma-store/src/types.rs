//! Persisted record types
//!
//! These are the structured values stored in the named buckets; field
//! names match the JSON the original records were written with, so
//! existing state files keep decoding.

use serde::{Deserialize, Serialize};

/// Mapping from content hash to catalog identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashMapping {
    #[serde(rename = "fileID")]
    pub file_id: i64,
    /// Zero for legacy entries written before the collection id was tracked
    #[serde(rename = "collectionID", default)]
    pub collection_id: i64,
}

/// Album routing mode for a watched folder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchMode {
    /// Everything goes to the default album
    Default,
    /// Everything goes to one user-named album
    Specified,
    /// Each subfolder becomes its own album
    FolderAlbums,
}

impl std::fmt::Display for WatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WatchMode::Default => "default",
            WatchMode::Specified => "specified",
            WatchMode::FolderAlbums => "folder-albums",
        };
        f.write_str(name)
    }
}

/// Persistent state of one watched folder
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    /// Absolute path being watched
    pub watch_path: String,
    pub mode: WatchMode,
    /// Album name for [`WatchMode::Specified`]
    pub album_name: String,
    /// Concurrent upload workers
    pub workers: usize,
    /// Debounce delay in milliseconds
    pub debounce_ms: u64,
    /// Unix timestamp (seconds)
    pub started_at: i64,
    /// Unix timestamp (seconds)
    pub last_processed: i64,
}

/// Processing status of a watched file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processing,
    Uploaded,
    Duplicate,
    Failed,
}

/// Record of a file the watcher has handled
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    /// Absolute path of the file
    pub file_path: String,
    /// SHA-256 hex of the plaintext
    pub file_hash: String,
    /// Catalog file id (zero if not uploaded)
    #[serde(rename = "fileID")]
    pub file_id: i64,
    #[serde(rename = "collectionID")]
    pub collection_id: i64,
    /// Unix timestamp (seconds)
    pub processed_at: i64,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of an in-flight or finished upload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Encrypting,
    Uploading,
    Completed,
    Failed,
}

/// Upload progress record, keyed by content hash
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    pub local_path: String,
    pub file_hash: String,
    #[serde(rename = "collectionID")]
    pub collection_id: i64,
    pub status: UploadStatus,
    #[serde(rename = "fileID")]
    pub file_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix timestamp (microseconds)
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_mapping_uses_original_field_names() {
        let mapping = FileHashMapping {
            file_id: 12,
            collection_id: 34,
        };
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"fileID":12,"collectionID":34}"#);
    }

    #[test]
    fn hash_mapping_defaults_collection_to_zero() {
        let mapping: FileHashMapping = serde_json::from_str(r#"{"fileID":99}"#).unwrap();
        assert_eq!(mapping.collection_id, 0);
    }

    #[test]
    fn watch_mode_round_trips_as_kebab_case() {
        assert_eq!(
            serde_json::to_string(&WatchMode::FolderAlbums).unwrap(),
            r#""folder-albums""#
        );
        let mode: WatchMode = serde_json::from_str(r#""specified""#).unwrap();
        assert_eq!(mode, WatchMode::Specified);
    }

    #[test]
    fn processed_file_omits_empty_error() {
        let record = ProcessedFile {
            file_path: "/p/a.jpg".into(),
            file_hash: "ab".into(),
            file_id: 1,
            collection_id: 2,
            processed_at: 3,
            status: FileStatus::Uploaded,
            error: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains(r#""status":"uploaded""#));
    }
}
