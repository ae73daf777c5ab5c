//! Object storage for screenshot images and candidate resume PDFs.
//!
//! `AppState` holds an `Arc<dyn BlobStore>`; production uses S3 (or MinIO locally).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;

/// How long a vision model may fetch a presigned screenshot URL.
pub const PRESIGN_TTL: Duration = Duration::from_secs(15 * 60);

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError>;

    async fn get(&self, key: &str) -> Result<Bytes, AppError>;

    /// Time-limited GET URL that a remote service can fetch without credentials.
    async fn presigned_url(&self, key: &str, ttl: Duration) -> Result<String, AppError>;
}

/// Storage key for a screenshot image.
pub fn screenshot_key(interview_id: Uuid, sequence_number: i32, extension: &str) -> String {
    format!(
        "screenshots/{interview_id}/{sequence_number:05}-{}.{extension}",
        Uuid::new_v4().simple()
    )
}

pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 download of {key} failed: {e}")))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("S3 body of {key} unreadable: {e}")))?;

        Ok(body.into_bytes())
    }

    async fn presigned_url(&self, key: &str, ttl: Duration) -> Result<String, AppError> {
        let config = PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::Storage(format!("Invalid presign TTL {ttl:?}: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| AppError::Storage(format!("Presigning {key} failed: {e}")))?;

        debug!("Presigned s3://{}/{} for {ttl:?}", self.bucket, key);
        Ok(request.uri().to_string())
    }
}
