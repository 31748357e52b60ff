//! Album resolution
//!
//! Finds a collection by decrypted name, or creates one. Collections whose
//! key or name cannot be opened with the master key are skipped; that is
//! how collections shared by other accounts fall out of consideration.

use crate::{Result, UploadError};
use luma_api::{
    ApiClient, Collection, CollectionAttributes, CreateCollectionRequest, COLLECTION_TYPE_ALBUM,
    COLLECTION_VERSION,
};
use luma_crypto::{unwrap_base64, wrap_base64, SecretKey};
use tracing::debug;

/// Holder of the account-level master key
pub struct AccountKeys {
    master_key: SecretKey,
}

impl AccountKeys {
    pub fn new(master_key: SecretKey) -> Self {
        Self { master_key }
    }

    pub fn master_key(&self) -> &SecretKey {
        &self.master_key
    }

    /// Open a collection's sealed key with the master key
    pub fn collection_key(&self, collection: &Collection) -> Result<SecretKey> {
        let key_bytes = unwrap_base64(
            &collection.encrypted_key,
            &collection.key_decryption_nonce,
            &self.master_key,
        )?;
        Ok(SecretKey::from_bytes(&key_bytes)?)
    }
}

/// Decrypt a collection's name with its collection key
pub fn decrypt_collection_name(collection: &Collection, key: &SecretKey) -> Result<String> {
    let name_bytes = unwrap_base64(
        &collection.encrypted_name,
        &collection.name_decryption_nonce,
        key,
    )?;
    String::from_utf8(name_bytes)
        .map_err(|_| UploadError::Validation("collection name is not valid utf-8".into()))
}

/// Find an album by name, creating it when allowed.
///
/// Returns the collection id and its key.
pub async fn get_or_create_album(
    client: &ApiClient,
    keys: &AccountKeys,
    album_name: &str,
    create_if_missing: bool,
) -> Result<(i64, SecretKey)> {
    let collections = client.get_collections().await?;

    for collection in &collections {
        if collection.is_deleted {
            continue;
        }
        // Skip collections we cannot open (e.g. shared with this account).
        let Ok(collection_key) = keys.collection_key(collection) else {
            continue;
        };
        let Ok(name) = decrypt_collection_name(collection, &collection_key) else {
            continue;
        };
        if name == album_name {
            return Ok((collection.id, collection_key));
        }
    }

    if !create_if_missing {
        return Err(UploadError::AlbumNotFound(album_name.to_string()));
    }

    create_album(client, keys, album_name).await
}

/// Resolve the key of a known collection id (lookup only, no creation)
pub async fn collection_key_by_id(
    client: &ApiClient,
    keys: &AccountKeys,
    collection_id: i64,
) -> Result<SecretKey> {
    let collections = client.get_collections().await?;
    let collection = collections
        .into_iter()
        .find(|c| c.id == collection_id)
        .ok_or_else(|| UploadError::AlbumNotFound(format!("collection {}", collection_id)))?;
    keys.collection_key(&collection)
}

async fn create_album(
    client: &ApiClient,
    keys: &AccountKeys,
    album_name: &str,
) -> Result<(i64, SecretKey)> {
    let collection_key = SecretKey::generate();

    let (encrypted_key, key_nonce) = wrap_base64(collection_key.as_bytes(), keys.master_key())?;
    let (encrypted_name, name_nonce) = wrap_base64(album_name.as_bytes(), &collection_key)?;

    let collection = client
        .create_collection(CreateCollectionRequest {
            encrypted_key,
            key_decryption_nonce: key_nonce,
            encrypted_name,
            name_decryption_nonce: name_nonce,
            collection_type: COLLECTION_TYPE_ALBUM.to_string(),
            attributes: CollectionAttributes {
                version: COLLECTION_VERSION,
            },
        })
        .await?;

    debug!(id = collection.id, name = album_name, "created album");
    Ok((collection.id, collection_key))
}
