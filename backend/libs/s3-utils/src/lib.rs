/// S3 utilities shared by the image services
///
/// Builds an SDK client for an S3-compatible endpoint (MinIO) with static
/// credentials and path-style addressing, and bootstraps the target bucket.
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use std::sync::Arc;
use tracing::info;

pub mod config;
pub mod operations;

pub use config::S3Config;
pub use operations::S3Operations;

#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("S3 request failed: {0}")]
    Request(String),
}

/// Shared S3 client wrapper
#[derive(Clone)]
pub struct S3Client {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Client {
    /// Create a client for the configured endpoint. No network traffic happens here.
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "static",
        );

        let sdk_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .force_path_style(config.path_style)
            .build();

        Self {
            client: Arc::new(Client::from_conf(sdk_config)),
            config,
        }
    }

    /// Get S3 configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    pub fn operations(&self) -> S3Operations {
        S3Operations::new(self.client.clone(), self.config.clone())
    }

    /// Probe the bucket; `Ok(false)` means the endpoint answered and the bucket is missing
    pub async fn bucket_exists(&self) -> Result<bool, S3Error> {
        match self
            .client
            .head_bucket()
            .bucket(&self.config.bucket)
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

    /// Create the bucket; a bucket that already exists is not an error
    pub async fn create_bucket(&self) -> Result<(), S3Error> {
        match self
            .client
            .create_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.config.bucket, "Bucket created");
                Ok(())
            }
            Err(e) => {
                let already_there = e
                    .as_service_error()
                    .map(|se| se.is_bucket_already_owned_by_you() || se.is_bucket_already_exists())
                    .unwrap_or(false);
                if already_there {
                    info!(bucket = %self.config.bucket, "Bucket already exists");
                    Ok(())
                } else {
                    Err(S3Error::Request(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }
}
