//! Upload orchestrator
//!
//! Runs the per-file pipeline over a pool of worker tasks. Per-file
//! failures are contained: they land in the summary and the batch keeps
//! going. Only album resolution aborts the whole batch, since every file
//! needs the same album.

use crate::{
    album::{get_or_create_album, AccountKeys},
    dedupe,
    encrypt::{encrypt_file_data, EncryptedUpload},
    models::{UploadConfig, UploadErrorEntry, UploadResult, UploadSummary},
    processor::{extract_metadata, validate_image_file},
    progress::ProgressTracker,
    s3,
    thumbnail::generate_thumbnail,
    Result, UploadError,
};
use luma_api::{ApiClient, FileCreateRequest, UploadFileAttributes, UploadMetadataAttributes};
use luma_crypto::{md5_bytes, md5_file, part_md5s, sha256_file, SecretKey};
use luma_store::Store;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Outcome of the per-file pipeline
enum PipelineOutcome {
    Uploaded { file_id: i64, bytes: i64 },
    Skipped { file_id: i64 },
}

/// Handles encrypted uploads for one account
#[derive(Clone)]
pub struct Uploader {
    client: Arc<ApiClient>,
    store: Arc<Store>,
    keys: Arc<AccountKeys>,
    config: UploadConfig,
    http: reqwest::Client,
}

impl Uploader {
    pub fn new(
        client: Arc<ApiClient>,
        store: Arc<Store>,
        keys: Arc<AccountKeys>,
        config: UploadConfig,
    ) -> Self {
        Self {
            client,
            store,
            keys,
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Upload a batch of files into one album.
    ///
    /// Resolves the album once, then fans the files out over the worker
    /// pool. Files are consumed in enqueue order.
    pub async fn upload_files(
        &self,
        files: Vec<PathBuf>,
        album_name: &str,
    ) -> Result<UploadSummary> {
        if files.is_empty() {
            return Err(UploadError::Validation("no files to upload".into()));
        }

        let (collection_id, collection_key) = get_or_create_album(
            &self.client,
            &self.keys,
            album_name,
            self.config.create_album,
        )
        .await?;
        info!(album = album_name, collection_id, "uploading to album");

        let total_bytes: i64 = files
            .iter()
            .filter_map(|f| std::fs::metadata(f).ok())
            .map(|m| m.len() as i64)
            .sum();
        let progress = Arc::new(ProgressTracker::new(files.len(), total_bytes));

        let (path_tx, path_rx) = mpsc::channel::<PathBuf>(files.len());
        for file in &files {
            // Capacity equals the batch size, so sends cannot block.
            path_tx
                .send(file.clone())
                .await
                .map_err(|_| UploadError::Cancelled)?;
        }
        drop(path_tx);
        let path_rx = Arc::new(Mutex::new(path_rx));

        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<UploadResult>();
        let mut workers = Vec::new();
        for _ in 0..self.config.workers.max(1) {
            let uploader = self.clone();
            let path_rx = Arc::clone(&path_rx);
            let result_tx = result_tx.clone();
            let progress = Arc::clone(&progress);
            let collection_key = collection_key.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let path = { path_rx.lock().await.recv().await };
                    let Some(path) = path else { break };
                    let result = uploader
                        .upload_file(&path, collection_id, &collection_key, &progress)
                        .await;
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let mut summary = UploadSummary {
            total_files: files.len(),
            total_bytes,
            ..Default::default()
        };

        while let Some(result) = result_rx.recv().await {
            if result.success {
                summary.completed_files += 1;
                summary.uploaded_bytes += result.uploaded_bytes;
            } else if result.skipped {
                summary.skipped_files += 1;
            } else {
                summary.failed_files += 1;
                summary.errors.push(UploadErrorEntry {
                    file_name: result.file_name.clone(),
                    error: result
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown error".into()),
                });
            }

            print!("\r{}", progress.render());
            let _ = std::io::stdout().flush();
        }
        println!();

        for worker in workers {
            let _ = worker.await;
        }

        Ok(summary)
    }

    /// Run the pipeline for one file, converting the outcome into an
    /// [`UploadResult`] and updating the shared progress tracker.
    async fn upload_file(
        &self,
        path: &Path,
        collection_id: i64,
        collection_key: &SecretKey,
        progress: &ProgressTracker,
    ) -> UploadResult {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        progress.set_current_file(&file_name);

        match self
            .run_pipeline(
                path,
                collection_id,
                collection_key,
                self.config.force_upload,
                Some(progress),
            )
            .await
        {
            Ok(PipelineOutcome::Uploaded { file_id, bytes }) => {
                progress.add_completed_file();
                progress.add_uploaded_bytes(bytes);
                UploadResult {
                    file_name,
                    success: true,
                    skipped: false,
                    error: None,
                    file_id,
                    uploaded_bytes: bytes,
                }
            }
            Ok(PipelineOutcome::Skipped { file_id }) => {
                progress.add_skipped_file();
                UploadResult {
                    file_name,
                    success: false,
                    skipped: true,
                    error: None,
                    file_id,
                    uploaded_bytes: 0,
                }
            }
            Err(error) => {
                progress.add_failed_file();
                UploadResult::failed(file_name, error)
            }
        }
    }

    /// Upload one file outside a batch (the watcher's path).
    ///
    /// Returns `(file_id, uploaded_bytes)`. A hash already present in the
    /// dedup store surfaces as [`UploadError::AlreadyUploaded`].
    pub async fn upload_single(
        &self,
        path: &Path,
        collection_id: i64,
        collection_key: &SecretKey,
    ) -> Result<(i64, i64)> {
        match self
            .run_pipeline(path, collection_id, collection_key, false, None)
            .await?
        {
            PipelineOutcome::Uploaded { file_id, bytes } => Ok((file_id, bytes)),
            PipelineOutcome::Skipped { file_id } => Err(UploadError::AlreadyUploaded(file_id)),
        }
    }

    /// The per-file pipeline. Steps are strictly sequential; the commit
    /// only happens after both blobs are stored.
    async fn run_pipeline(
        &self,
        path: &Path,
        collection_id: i64,
        collection_key: &SecretKey,
        force_upload: bool,
        progress: Option<&ProgressTracker>,
    ) -> Result<PipelineOutcome> {
        validate_image_file(path)?;

        let file_hash = {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || sha256_file(&path))
                .await
                .map_err(|e| UploadError::Hash(e.to_string()))?
                .map_err(|e| UploadError::Hash(e.to_string()))?
        };

        if !force_upload {
            if let Some(file_id) = dedupe::check_local_duplicate(&self.store, &file_hash)? {
                return Ok(PipelineOutcome::Skipped { file_id });
            }
        }

        let metadata = extract_metadata(path)?;
        let thumbnail = generate_thumbnail(path).await?;

        let mut encrypted = {
            let path = path.to_path_buf();
            let metadata = metadata.clone();
            let collection_key = collection_key.clone();
            tokio::task::spawn_blocking(move || {
                encrypt_file_data(&path, &thumbnail, &metadata, &collection_key)
            })
            .await
            .map_err(|e| UploadError::Encryption(luma_crypto::CryptoError::Encryption(e.to_string())))??
        };

        self.upload_blobs(&mut encrypted, progress).await?;

        let file_id = self.commit(collection_id, &encrypted).await?;

        // Correctness is already secured by the commit; a failed hash
        // write only impairs future dedup.
        if let Err(e) = dedupe::store_hash_mapping(&self.store, &file_hash, file_id, collection_id)
        {
            warn!(file = %path.display(), "failed to store hash mapping: {e}");
        }

        Ok(PipelineOutcome::Uploaded {
            file_id,
            bytes: metadata.file_size,
        })
    }

    /// PUT the encrypted file (single or multipart) and the thumbnail,
    /// filling in the server-assigned object keys.
    async fn upload_blobs(
        &self,
        encrypted: &mut EncryptedUpload,
        progress: Option<&ProgressTracker>,
    ) -> Result<()> {
        let blob_path = encrypted.encrypted_file_path.clone();
        let blob_size = encrypted.encrypted_file_size;

        encrypted.file_object_key = if blob_size as u64 >= self.config.multipart_min {
            let md5s = {
                let path = blob_path.clone();
                tokio::task::spawn_blocking(move || part_md5s(&path, s3::MULTIPART_PART_SIZE))
                    .await
                    .map_err(|e| UploadError::Hash(e.to_string()))?
                    .map_err(|e| UploadError::Hash(e.to_string()))?
            };
            let urls = self
                .client
                .get_multipart_upload_urls(blob_size, s3::MULTIPART_PART_SIZE as i64, md5s.clone())
                .await?;
            s3::upload_multipart(&self.http, &urls, &blob_path, &md5s, progress).await?;
            urls.object_key
        } else {
            let md5 = md5_file(&blob_path).map_err(|e| UploadError::Hash(e.to_string()))?;
            let upload_url = self.client.get_upload_url(blob_size, &md5).await?;
            s3::put_object(&self.http, &upload_url.url, &blob_path, &md5).await?;
            upload_url.object_key
        };

        let thumbnail_md5 = md5_bytes(&encrypted.encrypted_thumbnail);
        let thumbnail_url = self
            .client
            .get_upload_url(encrypted.encrypted_thumbnail.len() as i64, &thumbnail_md5)
            .await?;
        s3::put_bytes(
            &self.http,
            &thumbnail_url.url,
            encrypted.encrypted_thumbnail.clone(),
            &thumbnail_md5,
        )
        .await?;
        encrypted.thumbnail_object_key = thumbnail_url.object_key;

        Ok(())
    }

    /// Commit the catalog entry; returns the server-assigned file id.
    async fn commit(&self, collection_id: i64, encrypted: &EncryptedUpload) -> Result<i64> {
        let request = FileCreateRequest {
            collection_id,
            encrypted_key: encrypted.encrypted_key.clone(),
            key_decryption_nonce: encrypted.key_decryption_nonce.clone(),
            file: UploadFileAttributes {
                object_key: encrypted.file_object_key.clone(),
                decryption_header: encrypted.file_decryption_header.clone(),
                size: encrypted.encrypted_file_size,
            },
            thumbnail: UploadFileAttributes {
                object_key: encrypted.thumbnail_object_key.clone(),
                decryption_header: encrypted.thumbnail_decryption_header.clone(),
                size: encrypted.encrypted_thumbnail.len() as i64,
            },
            metadata: UploadMetadataAttributes {
                encrypted_data: encrypted.encrypted_metadata.clone(),
                decryption_header: encrypted.metadata_decryption_header.clone(),
            },
        };

        let file = self.client.create_file(request).await?;
        Ok(file.id)
    }
}
