//! Worker-side processing of a single task message
//!
//! Fetch the raw image, run the pipeline, store the result and mark the
//! record Done. Any error leaves the message uncommitted so Kafka redelivers it.

use crate::db::ImageRepository;
use crate::error::{AppError, Result};
use crate::kafka::MessageHandler;
use crate::metrics::{result_label, IMAGE_COMPENSATIONS_TOTAL};
use crate::models::{processed_object_key, TaskMessage};
use crate::services::processing::{sniff_content_type, Pipeline};
use crate::storage::{read_to_bytes, BlobStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct TaskProcessor {
    blobs: Arc<dyn BlobStore>,
    repo: Arc<dyn ImageRepository>,
}

impl TaskProcessor {
    pub fn new(blobs: Arc<dyn BlobStore>, repo: Arc<dyn ImageRepository>) -> Self {
        Self { blobs, repo }
    }

    /// Process one task, returning the key of the stored rendition
    pub async fn process(&self, task: &TaskMessage) -> Result<String> {
        let image = self.repo.get_by_id(&task.image_id).await?;

        let reader = self.blobs.get(&image.raw_object_key).await?;
        let raw = read_to_bytes(reader).await?;
        debug!(
            image_id = %image.id,
            raw_len = raw.len(),
            content_type = sniff_content_type(&raw),
            "Raw image loaded"
        );

        let processed = Pipeline::apply(task.actions.as_slice(), raw).await?;
        let content_type = sniff_content_type(&processed);

        let key = processed_object_key(&image.id);
        self.blobs.put(&key, processed, content_type).await?;

        if let Err(e) = self.repo.update_processed(&image.id, &key).await {
            let cleanup = self.blobs.remove(&key).await;
            IMAGE_COMPENSATIONS_TOTAL
                .with_label_values(&["processed_blob", result_label(&cleanup)])
                .inc();
            if let Err(cleanup_err) = cleanup {
                error!(
                    image_id = %image.id,
                    key = %key,
                    error = %cleanup_err,
                    "Failed to remove processed blob after metadata update failure"
                );
            }
            return Err(e);
        }

        info!(
            image_id = %image.id,
            key = %key,
            actions = ?task.actions,
            "Image processed"
        );
        Ok(key)
    }
}

#[async_trait]
impl MessageHandler for TaskProcessor {
    async fn handle(&self, payload: &[u8]) -> Result<()> {
        let task: TaskMessage = serde_json::from_slice(payload)
            .map_err(|e| AppError::BusConsume(format!("malformed task payload: {e}")))?;

        self.process(&task).await.map(|_| ())
    }
}
