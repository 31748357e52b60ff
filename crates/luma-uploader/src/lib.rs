//! # Luma Uploader
//!
//! The per-file upload pipeline and its orchestrator: validate, hash,
//! deduplicate, extract metadata, thumbnail, encrypt, upload to object
//! storage, commit to the catalog, record the hash.

pub mod album;
pub mod dedupe;
pub mod encrypt;
pub mod error;
pub mod models;
pub mod processor;
pub mod progress;
pub mod s3;
pub mod thumbnail;
pub mod uploader;

pub use album::{collection_key_by_id, decrypt_collection_name, get_or_create_album, AccountKeys};
pub use encrypt::{encrypt_file_data, EncryptedUpload};
pub use error::{Result, UploadError};
pub use models::{
    UploadConfig, UploadErrorEntry, UploadResult, UploadSummary, DEFAULT_ALBUM_NAME,
    DEFAULT_MULTIPART_MIN, DEFAULT_WORKERS,
};
pub use processor::{
    extract_metadata, is_image_file, validate_image_file, FileMetadata, FILE_TYPE_IMAGE,
    IMAGE_EXTENSIONS,
};
pub use progress::{format_bytes, ProgressTracker};
pub use thumbnail::{check_ffmpeg, generate_thumbnail, THUMBNAIL_MAX_BYTES};
pub use uploader::Uploader;
