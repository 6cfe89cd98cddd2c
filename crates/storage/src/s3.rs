//! S3-backed content store.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use shelfmark_core::error::CoreError;
use shelfmark_core::queue::ports::{ArtifactMeta, ArtifactReader, ContentStore};
use shelfmark_core::range::ByteRange;

/// Serves artifacts from one bucket. Keys are object keys; bodies are piped
/// from the `GetObject` response as they arrive.
#[derive(Debug, Clone)]
pub struct S3ContentStore {
    client: Client,
    bucket: String,
}

impl S3ContentStore {
    /// Build a client from the standard AWS environment (credentials,
    /// region, optional endpoint override).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::with_client(Client::new(&config), bucket)
    }

    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

/// `Range` request header value for an inclusive byte range.
fn range_header(range: ByteRange) -> String {
    format!("bytes={}-{}", range.start, range.end)
}

fn backend_error(key: &str, op: &str, err: impl std::fmt::Display) -> CoreError {
    tracing::error!(key, op, error = %err, "S3 request failed");
    CoreError::Internal(format!("Failed to {op} content artifact"))
}

#[async_trait]
impl ContentStore for S3ContentStore {
    async fn metadata(&self, key: &str) -> Result<Option<ArtifactMeta>, CoreError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(head) => Ok(Some(ArtifactMeta {
                size: head.content_length().unwrap_or(0).max(0) as u64,
                content_type: head.content_type().map(str::to_string),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(backend_error(key, "stat", e)),
        }
    }

    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ArtifactReader, CoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range.map(range_header))
            .send()
            .await
            .map_err(|e| backend_error(key, "open", e))?;

        Ok(Box::pin(response.body.into_async_read()))
    }
}
