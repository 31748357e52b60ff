//! Control-plane client
//!
//! Thin typed wrappers over the authenticated HTTP JSON API. Every method
//! maps a non-2xx response to [`ApiError::Server`] with the status and
//! body; transport failures surface as [`ApiError::Http`].

use crate::{types::*, ApiError, Result};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for [`ApiClient`]
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Base URL of the control plane, without a trailing slash
    pub endpoint: String,
    /// Bearer token for the account
    pub auth_token: String,
    /// Request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(endpoint: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Authenticated control-plane client
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    /// Create a new client with the given configuration
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            format!("luma/{}", env!("CARGO_PKG_VERSION"))
                .parse()
                .expect("static user agent"),
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint, path)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.config.auth_token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.config.auth_token)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    // ==================== Collections ====================

    /// Fetch every collection visible to the account
    pub async fn get_collections(&self) -> Result<Vec<Collection>> {
        #[derive(serde::Deserialize)]
        struct CollectionsResponse {
            collections: Vec<Collection>,
        }
        let response: CollectionsResponse = self.get_json("/collections").await?;
        debug!(count = response.collections.len(), "fetched collections");
        Ok(response.collections)
    }

    /// Create a collection (album)
    pub async fn create_collection(&self, request: CreateCollectionRequest) -> Result<Collection> {
        #[derive(serde::Deserialize)]
        struct CreateResponse {
            collection: Collection,
        }
        let response: CreateResponse = self.post_json("/collections", &request).await?;
        debug!(id = response.collection.id, "created collection");
        Ok(response.collection)
    }

    /// Add existing files to a collection with re-wrapped keys
    pub async fn add_files_to_collection(
        &self,
        collection_id: i64,
        files: Vec<CollectionFileItem>,
    ) -> Result<()> {
        let request = AddFilesToCollectionRequest {
            collection_id,
            files,
        };
        let response = self
            .http
            .post(self.url("/collections/add-files"))
            .bearer_auth(&self.config.auth_token)
            .json(&request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetch one catalog entry, including its sealed key and wrap nonce
    pub async fn get_file(&self, collection_id: i64, file_id: i64) -> Result<RemoteFile> {
        self.get_json(&format!("/collections/{}/files/{}", collection_id, file_id))
            .await
    }

    // ==================== Uploads ====================

    /// Request a single pre-signed upload URL
    pub async fn get_upload_url(&self, content_length: i64, content_md5: &str) -> Result<UploadUrl> {
        let request = GetUploadUrlRequest {
            content_length,
            content_md5: content_md5.to_string(),
        };
        self.post_json("/files/upload-url", &request).await
    }

    /// Request pre-signed URLs for a multipart upload
    pub async fn get_multipart_upload_urls(
        &self,
        content_length: i64,
        part_length: i64,
        part_md5s: Vec<String>,
    ) -> Result<MultipartUploadUrls> {
        let request = GetMultipartUploadUrlsRequest {
            content_length,
            part_length,
            part_md5s,
        };
        self.post_json("/files/multipart-upload-url", &request).await
    }

    /// Commit a catalog entry after the blobs are uploaded
    pub async fn create_file(&self, request: FileCreateRequest) -> Result<RemoteFile> {
        self.post_json("/files", &request).await
    }
}
