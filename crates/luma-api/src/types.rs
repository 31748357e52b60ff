//! Wire types for the control-plane API
//!
//! Field names mirror the server's JSON exactly; base64 values are
//! standard base64 with padding.

use serde::{Deserialize, Serialize};

/// A collection (album) as returned by the server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub collection_type: String,
    #[serde(rename = "encryptedKey")]
    pub encrypted_key: String,
    #[serde(rename = "keyDecryptionNonce")]
    pub key_decryption_nonce: String,
    #[serde(rename = "encryptedName", default)]
    pub encrypted_name: String,
    #[serde(rename = "nameDecryptionNonce", default)]
    pub name_decryption_nonce: String,
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
}

/// Collection attributes carried on creation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionAttributes {
    pub version: i32,
}

/// Payload for creating a collection
#[derive(Clone, Debug, Serialize)]
pub struct CreateCollectionRequest {
    #[serde(rename = "encryptedKey")]
    pub encrypted_key: String,
    #[serde(rename = "keyDecryptionNonce")]
    pub key_decryption_nonce: String,
    #[serde(rename = "encryptedName")]
    pub encrypted_name: String,
    #[serde(rename = "nameDecryptionNonce")]
    pub name_decryption_nonce: String,
    #[serde(rename = "type")]
    pub collection_type: String,
    pub attributes: CollectionAttributes,
}

/// A catalog file entry as returned by the server
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteFile {
    pub id: i64,
    #[serde(rename = "collectionID", default)]
    pub collection_id: i64,
    #[serde(rename = "encryptedKey", default)]
    pub encrypted_key: String,
    #[serde(rename = "keyDecryptionNonce", default)]
    pub key_decryption_nonce: String,
}

/// A single pre-signed upload URL
#[derive(Clone, Debug, Deserialize)]
pub struct UploadUrl {
    pub url: String,
    #[serde(rename = "objectKey")]
    pub object_key: String,
}

/// Pre-signed URLs for a multipart upload
#[derive(Clone, Debug, Deserialize)]
pub struct MultipartUploadUrls {
    #[serde(rename = "objectKey")]
    pub object_key: String,
    #[serde(rename = "partURLs")]
    pub part_urls: Vec<String>,
    #[serde(rename = "completeURL")]
    pub complete_url: String,
}

/// Request body for a single upload URL
#[derive(Clone, Debug, Serialize)]
pub struct GetUploadUrlRequest {
    #[serde(rename = "contentLength")]
    pub content_length: i64,
    #[serde(rename = "contentMD5")]
    pub content_md5: String,
}

/// Request body for multipart upload URLs
#[derive(Clone, Debug, Serialize)]
pub struct GetMultipartUploadUrlsRequest {
    #[serde(rename = "contentLength")]
    pub content_length: i64,
    #[serde(rename = "partLength")]
    pub part_length: i64,
    #[serde(rename = "partMd5s")]
    pub part_md5s: Vec<String>,
}

/// Object-key, header, and size triple for a file or thumbnail stream
#[derive(Clone, Debug, Serialize)]
pub struct UploadFileAttributes {
    #[serde(rename = "objectKey")]
    pub object_key: String,
    #[serde(rename = "decryptionHeader")]
    pub decryption_header: String,
    pub size: i64,
}

/// Encrypted metadata attached to a catalog entry
#[derive(Clone, Debug, Serialize)]
pub struct UploadMetadataAttributes {
    #[serde(rename = "encryptedData")]
    pub encrypted_data: String,
    #[serde(rename = "decryptionHeader")]
    pub decryption_header: String,
}

/// Payload for committing a catalog entry
#[derive(Clone, Debug, Serialize)]
pub struct FileCreateRequest {
    #[serde(rename = "collectionID")]
    pub collection_id: i64,
    #[serde(rename = "encryptedKey")]
    pub encrypted_key: String,
    #[serde(rename = "keyDecryptionNonce")]
    pub key_decryption_nonce: String,
    pub file: UploadFileAttributes,
    pub thumbnail: UploadFileAttributes,
    pub metadata: UploadMetadataAttributes,
}

/// One file entry when adding existing files to a collection
#[derive(Clone, Debug, Serialize)]
pub struct CollectionFileItem {
    pub id: i64,
    #[serde(rename = "encryptedKey")]
    pub encrypted_key: String,
    #[serde(rename = "keyDecryptionNonce")]
    pub key_decryption_nonce: String,
}

/// Request body for adding existing files to a collection
#[derive(Clone, Debug, Serialize)]
pub struct AddFilesToCollectionRequest {
    #[serde(rename = "collectionID")]
    pub collection_id: i64,
    pub files: Vec<CollectionFileItem>,
}
