/// Object operations against a single bucket
use crate::config::S3Config;
use crate::S3Error;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct S3Operations {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Operations {
    pub fn new(client: Arc<Client>, config: S3Config) -> Self {
        Self { client, config }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Upload an object of exactly `body.len()` bytes
    pub async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), S3Error> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size as i64)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| S3Error::Request(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket = %self.config.bucket, key, size, "Object uploaded");
        Ok(())
    }

    /// Open a streaming body; a missing key maps to [`S3Error::NotFound`]
    pub async fn get_object(&self, key: &str) -> Result<ByteStream, S3Error> {
        match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(output.body),
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                {
                    Err(S3Error::NotFound(key.to_string()))
                } else {
                    Err(S3Error::Request(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }

    /// Check if object exists
    pub async fn object_exists(&self, key: &str) -> Result<bool, S3Error> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(S3Error::Request(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }

    /// Delete an object, reporting [`S3Error::NotFound`] when it was already absent.
    ///
    /// S3 DeleteObject succeeds for missing keys, so existence is probed first.
    pub async fn delete_object(&self, key: &str) -> Result<(), S3Error> {
        if !self.object_exists(key).await? {
            return Err(S3Error::NotFound(key.to_string()));
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| S3Error::Request(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket = %self.config.bucket, key, "Object deleted");
        Ok(())
    }
}
