/// Upload and retrieval orchestration
///
/// An upload touches three systems in a fixed order: raw blob, metadata row,
/// task publish. A metadata failure removes the raw blob again; a publish
/// failure leaves both in place and the image stays Pending.
use crate::db::ImageRepository;
use crate::error::{AppError, Result};
use crate::kafka::TaskPublisher;
use crate::metrics::{
    result_label, IMAGE_COMPENSATIONS_TOTAL, IMAGE_TASKS_PUBLISHED_TOTAL, IMAGE_UPLOADS_TOTAL,
};
use crate::models::{raw_object_key, Action, Image, ImageStatus};
use crate::storage::{BlobReader, BlobStore};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Client-supplied metadata for a new upload
#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub file_size: i64,
    pub actions: Vec<Action>,
}

#[derive(Clone)]
pub struct ImageService {
    blobs: Arc<dyn BlobStore>,
    repo: Arc<dyn ImageRepository>,
    publisher: Arc<dyn TaskPublisher>,
}

impl ImageService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        repo: Arc<dyn ImageRepository>,
        publisher: Arc<dyn TaskPublisher>,
    ) -> Self {
        Self {
            blobs,
            repo,
            publisher,
        }
    }

    /// Store the upload, record it and enqueue its task. Returns the new image id.
    pub async fn create(&self, upload: NewImage, body: Bytes, content_type: &str) -> Result<String> {
        if upload.filename.trim().is_empty() {
            IMAGE_UPLOADS_TOTAL.with_label_values(&["validation_error"]).inc();
            return Err(AppError::Validation("filename must not be empty".to_string()));
        }
        if upload.file_size <= 0 {
            IMAGE_UPLOADS_TOTAL.with_label_values(&["validation_error"]).inc();
            return Err(AppError::Validation("file size must be positive".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let actions = if upload.actions.is_empty() {
            vec![Action::Resize]
        } else {
            upload.actions
        };

        let image = Image {
            raw_object_key: raw_object_key(&id),
            id: id.clone(),
            filename: upload.filename,
            file_size: upload.file_size,
            processed_object_key: String::new(),
            actions,
            status: ImageStatus::Pending,
        };

        if let Err(e) = self
            .blobs
            .put(&image.raw_object_key, body, content_type)
            .await
        {
            IMAGE_UPLOADS_TOTAL.with_label_values(&["storage_error"]).inc();
            error!(image_id = %id, error = %e, "Failed to store raw image");
            return Err(match e {
                AppError::StorageWrite(_) => e,
                other => AppError::StorageWrite(other.to_string()),
            });
        }

        if let Err(e) = self.repo.save(&image).await {
            IMAGE_UPLOADS_TOTAL.with_label_values(&["metadata_error"]).inc();
            error!(image_id = %id, error = %e, "Failed to save image metadata");
            self.compensate("raw_blob", &image.raw_object_key).await;
            return Err(match e {
                AppError::MetaWrite(_) => e,
                other => AppError::MetaWrite(other.to_string()),
            });
        }

        let published = self.publisher.publish(&id, &image.actions).await;
        IMAGE_TASKS_PUBLISHED_TOTAL
            .with_label_values(&[result_label(&published)])
            .inc();

        if let Err(e) = published {
            IMAGE_UPLOADS_TOTAL.with_label_values(&["publish_error"]).inc();
            warn!(
                image_id = %id,
                raw_key = %image.raw_object_key,
                error = %e,
                "Task publish failed; image left Pending without a task"
            );
            return Err(match e {
                AppError::BusPublish(_) => e,
                other => AppError::BusPublish(other.to_string()),
            });
        }

        IMAGE_UPLOADS_TOTAL.with_label_values(&["success"]).inc();
        info!(
            image_id = %id,
            filename = %image.filename,
            size = image.file_size,
            actions = ?image.actions,
            "Image accepted"
        );

        Ok(id)
    }

    /// Stream the processed image; only Done images are retrievable
    pub async fn get_by_id(&self, id: &str) -> Result<BlobReader> {
        let image = self.repo.get_by_id(id).await?;

        match image.status {
            ImageStatus::Pending => Err(AppError::Pending(id.to_string())),
            ImageStatus::Failed => Err(AppError::ProcessingFailed(id.to_string())),
            ImageStatus::Done => self.blobs.get(&image.processed_object_key).await,
        }
    }

    pub async fn get_status(&self, id: &str) -> Result<Image> {
        self.repo.get_by_id(id).await
    }

    /// Delete metadata, then the processed and raw blobs.
    ///
    /// The first failing step aborts the cascade; nothing is rolled back.
    /// Blobs that are already gone count as removed.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let image = self.repo.get_by_id(id).await?;

        self.repo.delete_by_id(id).await?;

        if !image.processed_object_key.is_empty() {
            remove_blob(self.blobs.as_ref(), &image.processed_object_key).await?;
        }
        remove_blob(self.blobs.as_ref(), &image.raw_object_key).await?;

        info!(image_id = %id, "Image deleted");
        Ok(())
    }

    /// Best-effort removal of a blob written earlier in a failed upload
    async fn compensate(&self, step: &str, key: &str) {
        let result = self.blobs.remove(key).await;
        IMAGE_COMPENSATIONS_TOTAL
            .with_label_values(&[step, result_label(&result)])
            .inc();

        match result {
            Ok(()) => info!(key = %key, "Removed orphaned blob"),
            Err(e) => error!(key = %key, error = %e, "Compensating blob removal failed"),
        }
    }
}

async fn remove_blob(blobs: &dyn BlobStore, key: &str) -> Result<()> {
    match blobs.remove(key).await {
        Ok(()) => Ok(()),
        Err(AppError::NotFound(_)) => {
            debug!(key = %key, "Blob already absent");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
