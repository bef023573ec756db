/// S3/MinIO implementation of the blob store
use super::{BlobReader, BlobStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use resilience::{presets, with_retry};
use s3_utils::{S3Client, S3Config, S3Error, S3Operations};
use tracing::{debug, info};

#[derive(Clone)]
pub struct S3BlobStore {
    ops: S3Operations,
}

impl S3BlobStore {
    /// Connect to the endpoint and make sure the bucket exists.
    ///
    /// The bucket probe is retried (5 attempts, 3s apart); exhausting the
    /// budget yields [`AppError::Unavailable`].
    pub async fn connect(config: S3Config) -> Result<Self> {
        let endpoint = config.endpoint_url();
        let client = S3Client::new(config);

        let exists = with_retry(presets::object_storage_connect(), || client.bucket_exists())
            .await
            .map_err(|e| {
                AppError::Unavailable(format!("object storage at {}: {}", endpoint, e))
            })?;

        if exists {
            debug!(bucket = %client.config().bucket, "Bucket already present");
        } else {
            client
                .create_bucket()
                .await
                .map_err(|e| AppError::Unavailable(format!("bucket bootstrap failed: {}", e)))?;
        }

        info!(
            endpoint = %endpoint,
            bucket = %client.config().bucket,
            "Object storage ready"
        );

        Ok(Self {
            ops: client.operations(),
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        self.ops
            .put_object(key, body, content_type)
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<BlobReader> {
        let body = self.ops.get_object(key).await.map_err(read_error)?;
        Ok(Box::pin(body.into_async_read()))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.ops.delete_object(key).await.map_err(|e| match e {
            S3Error::NotFound(key) => AppError::NotFound(key),
            other => AppError::StorageWrite(other.to_string()),
        })
    }
}

fn read_error(err: S3Error) -> AppError {
    match err {
        S3Error::NotFound(key) => AppError::NotFound(key),
        other => AppError::StorageRead(other.to_string()),
    }
}
