/*
[INPUT]:  Backend HTTP client, bucket, object key and file bytes
[OUTPUT]: Uploaded objects and their public URLs
[POS]:    Storage layer - object upload and URL resolution
[UPDATE]: When storage endpoints or upload options change
*/

use reqwest::{Method, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::info;

use crate::http::{BackendClient, BackendError, Result};

/// Body returned by a successful upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}

/// Client for the object storage endpoints
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: BackendClient,
}

impl StorageClient {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Upload `bytes` under `key`; an existing object is not overwritten.
    ///
    /// POST /storage/v1/object/{bucket}/{key}
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadResponse> {
        let url = self.object_url(&["storage", "v1", "object"], bucket, key)?;
        let size = bytes.len();
        let builder = self
            .client
            .authed_request_url(Method::POST, url)
            .await
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        let response: UploadResponse = self.client.send_json(builder).await?;
        info!(bucket, key, size, "object uploaded");
        Ok(response)
    }

    /// Public URL of an object in a public bucket; no request is made
    pub fn public_url(&self, bucket: &str, key: &str) -> Result<Url> {
        self.object_url(&["storage", "v1", "object", "public"], bucket, key)
    }

    fn object_url(&self, prefix: &[&str], bucket: &str, key: &str) -> Result<Url> {
        if bucket.is_empty() || key.is_empty() {
            return Err(BackendError::Config("bucket and object key must not be empty".to_string()));
        }

        let mut url = self.client.base_url().clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::Config("backend URL cannot be a base".to_string()))?;
            segments.pop_if_empty().extend(prefix).push(bucket);
            // Slashes inside the key are folders; each part is encoded on its own.
            segments.extend(key.split('/'));
        }
        Ok(url)
    }
}
