//! Local deduplication by content hash

use crate::Result;
use luma_store::{FileHashMapping, Store};

/// Check whether this content hash is already uploaded.
///
/// Returns the existing file id when present.
pub fn check_local_duplicate(store: &Store, file_hash: &str) -> Result<Option<i64>> {
    Ok(store.get_file_id_by_hash(file_hash)?)
}

/// Full hash mapping, including the collection the file was first
/// uploaded to (zero for legacy entries).
pub fn get_hash_mapping(store: &Store, file_hash: &str) -> Result<Option<FileHashMapping>> {
    Ok(store.get_file_hash_mapping(file_hash)?)
}

/// Record hash -> (file id, collection id) after a successful commit
pub fn store_hash_mapping(
    store: &Store,
    file_hash: &str,
    file_id: i64,
    collection_id: i64,
) -> Result<()> {
    store.save_file_hash_mapping(file_hash, file_id, collection_id)?;
    Ok(())
}
