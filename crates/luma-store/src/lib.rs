//! # Luma Store
//!
//! Embedded key-value store backing deduplication and watch state. One
//! SQLite file holds every named bucket as rows of `(bucket, key, value)`;
//! WAL mode keeps readers and writers from blocking each other across
//! buckets while SQLite serializes writers.

pub mod error;
pub mod types;

pub use error::{Result, StoreError};
pub use types::{
    FileHashMapping, FileStatus, ProcessedFile, UploadState, UploadStatus, WatchMode, WatchState,
};

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Named buckets within the account store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    KvConfig,
    RemoteAlbums,
    RemoteFiles,
    RemoteAlbumEntries,
    UploadStates,
    FileHashes,
    WatchStates,
    WatchFiles,
}

impl Bucket {
    /// Bucket name as stored on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::KvConfig => "kvConfig",
            Bucket::RemoteAlbums => "remoteAlbums",
            Bucket::RemoteFiles => "remoteFiles",
            Bucket::RemoteAlbumEntries => "remoteAlbumEntries",
            Bucket::UploadStates => "uploadStates",
            Bucket::FileHashes => "fileHashes",
            Bucket::WatchStates => "watchStates",
            Bucket::WatchFiles => "watchFiles",
        }
    }
}

/// Keys in `watchStates` and `watchFiles` are the lowercase hex of the
/// absolute path, which keeps arbitrary paths valid as keys.
fn path_key(path: &str) -> String {
    hex::encode(path.as_bytes())
}

/// Embedded state store for one account
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// Open an in-memory store; used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                bucket TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (bucket, key)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ==================== Raw bucket access ====================

    /// Put a raw value
    pub fn put(&self, bucket: Bucket, key: &str, value: &[u8]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO kv (bucket, key, value) VALUES (?, ?, ?)",
            params![bucket.as_str(), key, value],
        )?;
        Ok(())
    }

    /// Get a raw value
    pub fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE bucket = ? AND key = ?",
                params![bucket.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Delete a value
    pub fn delete(&self, bucket: Bucket, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM kv WHERE bucket = ? AND key = ?",
            params![bucket.as_str(), key],
        )?;
        Ok(())
    }

    /// All values in a bucket, in key order
    pub fn get_all(&self, bucket: Bucket) -> Result<Vec<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE bucket = ? ORDER BY key")?;
        let rows = stmt.query_map(params![bucket.as_str()], |row| row.get(0))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    // ==================== Config values ====================

    /// Read a configuration value from `kvConfig`
    pub fn get_config_value(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::KvConfig, key)
    }

    /// Write a configuration value to `kvConfig`
    pub fn put_config_value(&self, key: &str, value: &[u8]) -> Result<()> {
        self.put(Bucket::KvConfig, key, value)
    }

    // ==================== Hash mappings ====================

    /// Look up the hash mapping for a content hash.
    ///
    /// The stored value is JSON, but entries written by older versions are
    /// a plain decimal file-id string; those decode with collection id 0.
    pub fn get_file_hash_mapping(&self, file_hash: &str) -> Result<Option<FileHashMapping>> {
        let Some(value) = self.get(Bucket::FileHashes, file_hash)? else {
            return Ok(None);
        };

        if let Ok(mapping) = serde_json::from_slice::<FileHashMapping>(&value) {
            return Ok(Some(mapping));
        }

        // Legacy format: decimal file id
        let text = String::from_utf8_lossy(&value);
        match text.trim().parse::<i64>() {
            Ok(file_id) => Ok(Some(FileHashMapping {
                file_id,
                collection_id: 0,
            })),
            Err(_) => Err(StoreError::CorruptRecord {
                bucket: Bucket::FileHashes.as_str(),
                reason: format!("unparseable hash mapping: {:?}", text),
            }),
        }
    }

    /// File id for a content hash, if present
    pub fn get_file_id_by_hash(&self, file_hash: &str) -> Result<Option<i64>> {
        Ok(self.get_file_hash_mapping(file_hash)?.map(|m| m.file_id))
    }

    /// Save the full hash mapping; always writes the structured format.
    pub fn save_file_hash_mapping(
        &self,
        file_hash: &str,
        file_id: i64,
        collection_id: i64,
    ) -> Result<()> {
        let mapping = FileHashMapping {
            file_id,
            collection_id,
        };
        self.put(
            Bucket::FileHashes,
            file_hash,
            &serde_json::to_vec(&mapping)?,
        )
    }

    // ==================== Upload states ====================

    /// Read the upload state for a content hash
    pub fn get_upload_state(&self, file_hash: &str) -> Result<Option<UploadState>> {
        let Some(value) = self.get(Bucket::UploadStates, file_hash)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&value)?))
    }

    /// Save an upload state, stamping `updated_at`
    pub fn save_upload_state(&self, state: &mut UploadState) -> Result<()> {
        state.updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as i64;
        let value = serde_json::to_vec(state)?;
        self.put(Bucket::UploadStates, &state.file_hash, &value)
    }

    // ==================== Watch states ====================

    /// Read the watch state for a watched path
    pub fn get_watch_state(&self, watch_path: &str) -> Result<Option<WatchState>> {
        let Some(value) = self.get(Bucket::WatchStates, &path_key(watch_path))? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&value)?))
    }

    /// Save a watch state
    pub fn save_watch_state(&self, state: &WatchState) -> Result<()> {
        self.put(
            Bucket::WatchStates,
            &path_key(&state.watch_path),
            &serde_json::to_vec(state)?,
        )
    }

    // ==================== Processed files ====================

    /// Read the processed-file record for a path
    pub fn get_processed_file(&self, file_path: &str) -> Result<Option<ProcessedFile>> {
        let Some(value) = self.get(Bucket::WatchFiles, &path_key(file_path))? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&value)?))
    }

    /// Save a processed-file record
    pub fn save_processed_file(&self, record: &ProcessedFile) -> Result<()> {
        self.put(
            Bucket::WatchFiles,
            &path_key(&record.file_path),
            &serde_json::to_vec(record)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn raw_put_get_delete() {
        let store = store();
        assert!(store.get(Bucket::KvConfig, "k").unwrap().is_none());

        store.put(Bucket::KvConfig, "k", b"v").unwrap();
        assert_eq!(store.get(Bucket::KvConfig, "k").unwrap().unwrap(), b"v");

        store.delete(Bucket::KvConfig, "k").unwrap();
        assert!(store.get(Bucket::KvConfig, "k").unwrap().is_none());
    }

    #[test]
    fn buckets_are_isolated() {
        let store = store();
        store.put(Bucket::FileHashes, "k", b"hashes").unwrap();
        store.put(Bucket::WatchFiles, "k", b"watch").unwrap();
        assert_eq!(
            store.get(Bucket::FileHashes, "k").unwrap().unwrap(),
            b"hashes"
        );
        assert_eq!(store.get(Bucket::WatchFiles, "k").unwrap().unwrap(), b"watch");
    }

    #[test]
    fn hash_mapping_roundtrip() {
        let store = store();
        store.save_file_hash_mapping("abcd", 7, 3).unwrap();
        let mapping = store.get_file_hash_mapping("abcd").unwrap().unwrap();
        assert_eq!(mapping.file_id, 7);
        assert_eq!(mapping.collection_id, 3);
        assert_eq!(store.get_file_id_by_hash("abcd").unwrap(), Some(7));
    }

    #[test]
    fn hash_mapping_reads_legacy_decimal_values() {
        let store = store();
        store.put(Bucket::FileHashes, "legacy", b"12345").unwrap();
        let mapping = store.get_file_hash_mapping("legacy").unwrap().unwrap();
        assert_eq!(mapping.file_id, 12345);
        assert_eq!(mapping.collection_id, 0);
    }

    #[test]
    fn hash_mapping_rejects_garbage() {
        let store = store();
        store
            .put(Bucket::FileHashes, "bad", b"not a mapping")
            .unwrap();
        assert!(store.get_file_hash_mapping("bad").is_err());
    }

    #[test]
    fn watch_state_keyed_by_hex_path() {
        let store = store();
        let state = WatchState {
            watch_path: "/photos/in".into(),
            mode: WatchMode::FolderAlbums,
            album_name: String::new(),
            workers: 4,
            debounce_ms: 5000,
            started_at: 100,
            last_processed: 100,
        };
        store.save_watch_state(&state).unwrap();

        let loaded = store.get_watch_state("/photos/in").unwrap().unwrap();
        assert_eq!(loaded.mode, WatchMode::FolderAlbums);
        assert_eq!(loaded.debounce_ms, 5000);

        // The raw key is the lowercase hex of the absolute path.
        let raw = store
            .get(Bucket::WatchStates, &hex::encode(b"/photos/in"))
            .unwrap();
        assert!(raw.is_some());
    }

    #[test]
    fn processed_file_roundtrip() {
        let store = store();
        let record = ProcessedFile {
            file_path: "/photos/in/a.jpg".into(),
            file_hash: "ffee".into(),
            file_id: 42,
            collection_id: 9,
            processed_at: 1_700_000_000,
            status: FileStatus::Duplicate,
            error: None,
        };
        store.save_processed_file(&record).unwrap();
        let loaded = store
            .get_processed_file("/photos/in/a.jpg")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, FileStatus::Duplicate);
        assert_eq!(loaded.file_id, 42);
    }

    #[test]
    fn upload_state_stamps_updated_at() {
        let store = store();
        let mut state = UploadState {
            local_path: "/p/a.jpg".into(),
            file_hash: "aa".into(),
            collection_id: 1,
            status: UploadStatus::Completed,
            file_id: 5,
            error: None,
            updated_at: 0,
        };
        store.save_upload_state(&mut state).unwrap();
        assert!(state.updated_at > 0);
        let loaded = store.get_upload_state("aa").unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Completed);
    }

    #[test]
    fn get_all_returns_bucket_values() {
        let store = store();
        store.put(Bucket::RemoteAlbums, "a", b"1").unwrap();
        store.put(Bucket::RemoteAlbums, "b", b"2").unwrap();
        store.put(Bucket::RemoteFiles, "c", b"3").unwrap();
        assert_eq!(store.get_all(Bucket::RemoteAlbums).unwrap().len(), 2);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("state.db");
        {
            let store = Store::open(&db).unwrap();
            store.save_file_hash_mapping("h", 1, 2).unwrap();
        }
        let store = Store::open(&db).unwrap();
        assert!(store.get_file_hash_mapping("h").unwrap().is_some());
    }
}
