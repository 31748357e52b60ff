//! # Luma API
//!
//! Typed client for the Luma control plane: collections, upload-URL
//! issuance, catalog commits. The pre-signed URLs it hands out are
//! consumed by the uploader's S3 layer, not by this crate.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, ApiConfig};
pub use error::{ApiError, Result};
pub use types::{
    AddFilesToCollectionRequest, Collection, CollectionAttributes, CollectionFileItem,
    CreateCollectionRequest, FileCreateRequest, GetMultipartUploadUrlsRequest,
    GetUploadUrlRequest, MultipartUploadUrls, RemoteFile, UploadFileAttributes,
    UploadMetadataAttributes, UploadUrl,
};

/// Collection type string for albums
pub const COLLECTION_TYPE_ALBUM: &str = "album";

/// Schema version sent in collection attributes
pub const COLLECTION_VERSION: i32 = 1;
