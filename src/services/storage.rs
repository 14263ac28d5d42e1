//! S3 object upload.

use super::ServiceContext;
use crate::error::{map_s3_error, BedrockError, DatasetError};
use crate::transport::HttpRequest;
use crate::types::S3Uri;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tracing::{debug, info, instrument};

/// A single-request object upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Object contents.
    pub body: Bytes,
    /// Content type; `application/octet-stream` when unset.
    pub content_type: Option<String>,
}

impl PutObjectRequest {
    /// Upload `body` to `destination`.
    pub fn new(destination: &S3Uri, body: impl Into<Bytes>) -> Self {
        Self {
            bucket: destination.bucket.clone(),
            key: destination.key.clone(),
            body: body.into(),
            content_type: None,
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Result of a successful PutObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Entity tag of the stored object.
    pub e_tag: Option<String>,
    /// Version ID, when the bucket is versioned.
    pub version_id: Option<String>,
    /// S3 request ID.
    pub request_id: Option<String>,
}

/// Object storage operations.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Store an object.
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, BedrockError>;

    /// Read a local file and store it unmodified at `destination`.
    async fn upload_file(
        &self,
        path: &Path,
        destination: &S3Uri,
    ) -> Result<PutObjectOutput, BedrockError> {
        let body = tokio::fs::read(path).await.map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.put_object(PutObjectRequest::new(destination, body)).await
    }
}

/// S3 implementation of [`StorageService`].
pub struct StorageServiceImpl {
    context: ServiceContext,
}

impl StorageServiceImpl {
    pub(crate) fn new(context: ServiceContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl StorageService for StorageServiceImpl {
    #[instrument(skip(self, request), fields(bucket = %request.bucket, key = %request.key, size = request.body.len()))]
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, BedrockError> {
        let url = self
            .context
            .config
            .s3_object_url(&request.bucket, &request.key)?;
        debug!(url = %url, "Uploading object");

        let content_type = request
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let http_request = HttpRequest::new("PUT", url)
            .with_header("content-length", request.body.len().to_string())
            .with_header("content-type", content_type)
            .with_body(request.body);

        let response = self.context.execute(http_request).await?;
        if !response.is_success() {
            return Err(map_s3_error(&response));
        }

        let output = PutObjectOutput {
            e_tag: response.etag().map(String::from),
            version_id: response.get_header("x-amz-version-id").map(String::from),
            request_id: response.request_id().map(String::from),
        };
        info!(e_tag = ?output.e_tag, "Object uploaded");
        Ok(output)
    }
}
