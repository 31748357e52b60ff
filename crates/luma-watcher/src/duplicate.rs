//! Duplicate handling
//!
//! Attaches an already-uploaded file to another album by re-wrapping its
//! file key with the target collection key. The blob, stream headers,
//! thumbnail, and metadata are untouched; only one small catalog call is
//! made.

use crate::{Result, WatchError};
use luma_api::{ApiClient, CollectionFileItem};
use luma_crypto::{unwrap_base64, wrap_base64, SecretKey};
use luma_store::{FileStatus, ProcessedFile, Store};
use luma_uploader::{collection_key_by_id, AccountKeys};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// What the duplicate check concluded for a path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateOutcome {
    /// Unknown hash; the file must be uploaded
    NotDuplicate,
    /// Already a member of the target album
    AlreadyInAlbum { file_id: i64 },
    /// Existing file was attached to the target album via key re-wrap
    AddedToAlbum { file_id: i64 },
}

/// Open a sealed file key with the original collection key and seal it
/// again under the target collection key.
///
/// Returns the new `(sealed, nonce)` pair, base64-encoded.
pub fn rewrap_file_key(
    encrypted_key: &str,
    key_decryption_nonce: &str,
    original_key: &SecretKey,
    target_key: &SecretKey,
) -> Result<(String, String)> {
    let file_key = unwrap_base64(encrypted_key, key_decryption_nonce, original_key)?;
    Ok(wrap_base64(&file_key, target_key)?)
}

/// Checks uploads against the dedup store and re-homes duplicates
pub struct DuplicateHandler {
    client: Arc<ApiClient>,
    store: Arc<Store>,
    keys: Arc<AccountKeys>,
}

impl DuplicateHandler {
    pub fn new(client: Arc<ApiClient>, store: Arc<Store>, keys: Arc<AccountKeys>) -> Self {
        Self {
            client,
            store,
            keys,
        }
    }

    /// Decide what to do with a file whose hash may already be uploaded.
    ///
    /// A hash found under a different collection triggers the re-wrap and
    /// one `add_files_to_collection` call; the local mapping then points
    /// at the target collection.
    pub async fn check_and_handle(
        &self,
        file_hash: &str,
        file_path: &Path,
        target_collection_id: i64,
        target_collection_key: &SecretKey,
    ) -> Result<DuplicateOutcome> {
        let Some(mapping) = self.store.get_file_hash_mapping(file_hash)? else {
            return Ok(DuplicateOutcome::NotDuplicate);
        };

        if mapping.collection_id == target_collection_id {
            self.record_processed(
                file_path,
                file_hash,
                mapping.file_id,
                target_collection_id,
                FileStatus::Duplicate,
                None,
            );
            return Ok(DuplicateOutcome::AlreadyInAlbum {
                file_id: mapping.file_id,
            });
        }

        self.add_file_to_album(
            mapping.file_id,
            mapping.collection_id,
            target_collection_id,
            target_collection_key,
        )
        .await?;

        if let Err(e) = self.store.save_file_hash_mapping(
            file_hash,
            mapping.file_id,
            target_collection_id,
        ) {
            warn!("failed to update hash mapping: {e}");
        }
        self.record_processed(
            file_path,
            file_hash,
            mapping.file_id,
            target_collection_id,
            FileStatus::Duplicate,
            None,
        );

        Ok(DuplicateOutcome::AddedToAlbum {
            file_id: mapping.file_id,
        })
    }

    /// Re-wrap the file's sealed key and add it to the target collection
    async fn add_file_to_album(
        &self,
        file_id: i64,
        original_collection_id: i64,
        target_collection_id: i64,
        target_collection_key: &SecretKey,
    ) -> Result<()> {
        let file = self.client.get_file(original_collection_id, file_id).await?;

        let original_key =
            collection_key_by_id(&self.client, &self.keys, original_collection_id).await?;

        let (encrypted_key, key_decryption_nonce) = rewrap_file_key(
            &file.encrypted_key,
            &file.key_decryption_nonce,
            &original_key,
            target_collection_key,
        )?;

        self.client
            .add_files_to_collection(
                target_collection_id,
                vec![CollectionFileItem {
                    id: file_id,
                    encrypted_key,
                    key_decryption_nonce,
                }],
            )
            .await?;

        debug!(
            file_id,
            from = original_collection_id,
            to = target_collection_id,
            "added duplicate to album"
        );
        Ok(())
    }

    /// Record hash mapping and processed-file entry after a fresh upload
    pub fn save_uploaded(
        &self,
        file_hash: &str,
        file_path: &Path,
        file_id: i64,
        collection_id: i64,
    ) -> Result<()> {
        self.store
            .save_file_hash_mapping(file_hash, file_id, collection_id)?;
        self.record_processed(
            file_path,
            file_hash,
            file_id,
            collection_id,
            FileStatus::Uploaded,
            None,
        );
        Ok(())
    }

    /// Record a failed attempt for the path
    pub fn save_failed(&self, file_hash: &str, file_path: &Path, error: &WatchError) {
        self.record_processed(file_path, file_hash, 0, 0, FileStatus::Failed, Some(error));
    }

    fn record_processed(
        &self,
        file_path: &Path,
        file_hash: &str,
        file_id: i64,
        collection_id: i64,
        status: FileStatus,
        error: Option<&WatchError>,
    ) {
        let record = ProcessedFile {
            file_path: file_path.to_string_lossy().into_owned(),
            file_hash: file_hash.to_string(),
            file_id,
            collection_id,
            processed_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64,
            status,
            error: error.map(|e| e.to_string()),
        };
        if let Err(e) = self.store.save_processed_file(&record) {
            warn!("failed to save processed file record: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrap_preserves_the_file_key() {
        let collection_a = SecretKey::generate();
        let collection_b = SecretKey::generate();
        let file_key = SecretKey::generate();

        let (sealed_a, nonce_a) = wrap_base64(file_key.as_bytes(), &collection_a).unwrap();
        let (sealed_b, nonce_b) =
            rewrap_file_key(&sealed_a, &nonce_a, &collection_a, &collection_b).unwrap();

        // The new sealed key opens with B's key to the same 32 bytes.
        let opened = unwrap_base64(&sealed_b, &nonce_b, &collection_b).unwrap();
        assert_eq!(opened.as_slice(), file_key.as_bytes());

        // And no longer opens with A's key.
        assert!(unwrap_base64(&sealed_b, &nonce_b, &collection_a).is_err());
    }

    #[test]
    fn rewrap_with_wrong_original_key_fails() {
        let file_key = SecretKey::generate();
        let (sealed, nonce) = wrap_base64(file_key.as_bytes(), &SecretKey::generate()).unwrap();
        let result = rewrap_file_key(
            &sealed,
            &nonce,
            &SecretKey::generate(),
            &SecretKey::generate(),
        );
        assert!(result.is_err());
    }
}
