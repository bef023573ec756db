/// Blob storage gateway
///
/// Raw uploads and processed renditions live in an S3-compatible bucket.
/// Orchestrators depend on [`BlobStore`] only; [`S3BlobStore`] is the
/// production implementation.
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

pub mod s3;

pub use s3::S3BlobStore;

/// Readable object body; the holder owns it and dropping it closes the stream
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `body` under `key` with the given content type.
    /// Transport and server failures surface as [`AppError::StorageWrite`].
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    /// Open a stream on `key`; a missing key is [`AppError::NotFound`]
    async fn get(&self, key: &str) -> Result<BlobReader>;

    /// Remove `key`; a missing key is [`AppError::NotFound`] so callers can
    /// decide whether removal is already satisfied
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Drain a blob stream into memory
pub async fn read_to_bytes(mut reader: BlobReader) -> Result<Bytes> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|e| AppError::StorageRead(e.to_string()))?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_to_bytes_drains_stream() {
        let reader: BlobReader = Box::pin(Cursor::new(vec![1u8, 2, 3, 4]));
        let bytes = read_to_bytes(reader).await.unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3, 4]);
    }
}
