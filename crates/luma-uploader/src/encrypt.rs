//! Per-file encryption
//!
//! Generates the file key, seals it under the collection key, and produces
//! the three encrypted streams (file, thumbnail, metadata). The encrypted
//! file lands in a scoped temp directory owned by the returned bundle, so
//! it is removed on every exit path of the upload, success or failure.

use crate::{processor::FileMetadata, Result, UploadError};
use base64::Engine;
use luma_crypto::{encrypt_bytes, encrypt_stream, wrap_base64, SecretKey};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

fn b64(data: impl AsRef<[u8]>) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Everything produced by encrypting one file, ready for upload and commit
pub struct EncryptedUpload {
    /// File key sealed under the collection key, base64
    pub encrypted_key: String,
    /// Wrap nonce, base64
    pub key_decryption_nonce: String,

    /// Path of the encrypted file blob inside `temp_dir`
    pub encrypted_file_path: PathBuf,
    /// File stream header, base64
    pub file_decryption_header: String,
    pub encrypted_file_size: i64,

    pub encrypted_thumbnail: Vec<u8>,
    /// Thumbnail stream header, base64
    pub thumbnail_decryption_header: String,

    /// Encrypted metadata, base64
    pub encrypted_metadata: String,
    /// Metadata stream header, base64
    pub metadata_decryption_header: String,

    /// Object keys are assigned by the upload-URL issuer after the PUTs
    pub file_object_key: String,
    pub thumbnail_object_key: String,

    // Held for its Drop: deletes the temp directory on all exit paths.
    _temp_dir: TempDir,
}

/// Encrypt a file, its thumbnail, and its metadata with a fresh file key
pub fn encrypt_file_data(
    file_path: &Path,
    thumbnail: &[u8],
    metadata: &FileMetadata,
    collection_key: &SecretKey,
) -> Result<EncryptedUpload> {
    let file_key = SecretKey::generate();
    let (encrypted_key, key_decryption_nonce) = wrap_base64(file_key.as_bytes(), collection_key)?;

    let temp_dir = tempfile::tempdir()?;
    let encrypted_file_path = temp_dir.path().join("encrypted_file");

    let input = BufReader::new(File::open(file_path)?);
    let mut output = BufWriter::new(File::create(&encrypted_file_path)?);
    let (file_header, encrypted_file_size) = encrypt_stream(input, &mut output, &file_key)?;
    output.flush()?;

    let (encrypted_thumbnail, thumbnail_header) = encrypt_bytes(thumbnail, &file_key)?;

    let metadata_json = serde_json::to_vec(metadata)
        .map_err(|e| UploadError::Metadata(format!("failed to serialize metadata: {}", e)))?;
    let (encrypted_metadata, metadata_header) = encrypt_bytes(&metadata_json, &file_key)?;

    debug!(
        file = %file_path.display(),
        encrypted_size = encrypted_file_size,
        thumbnail_size = encrypted_thumbnail.len(),
        "encrypted upload streams"
    );

    Ok(EncryptedUpload {
        encrypted_key,
        key_decryption_nonce,
        encrypted_file_path,
        file_decryption_header: b64(file_header),
        encrypted_file_size: encrypted_file_size as i64,
        encrypted_thumbnail,
        thumbnail_decryption_header: b64(thumbnail_header),
        encrypted_metadata: b64(&encrypted_metadata),
        metadata_decryption_header: b64(metadata_header),
        file_object_key: String::new(),
        thumbnail_object_key: String::new(),
        _temp_dir: temp_dir,
    })
}
