//! In-memory fakes for integration tests
//!
//! Each fake implements one gateway trait and supports failure injection, so
//! orchestrator, worker and HTTP tests run without Postgres, MinIO or Kafka.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use image_service::db::ImageRepository;
use image_service::error::{AppError, Result};
use image_service::kafka::{Delivery, TaskPublisher, TaskSubscription};
use image_service::models::{Action, Image, ImageStatus, TaskMessage};
use image_service::services::{ImageService, TaskProcessor};
use image_service::storage::{BlobReader, BlobStore};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ========================================
// Blob store
// ========================================

#[derive(Default)]
pub struct FakeBlobStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    pub fail_put: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl FakeBlobStore {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| data.clone())
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn insert(&self, key: &str, data: Bytes) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, "application/octet-stream".to_string()));
    }

    pub fn delete(&self, key: &str) {
        self.objects.lock().unwrap().remove(key);
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::StorageWrite("injected put failure".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<BlobReader> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AppError::StorageRead("injected get failure".into()));
        }
        let data = self
            .object(key)
            .ok_or_else(|| AppError::NotFound(key.to_string()))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(AppError::StorageWrite("injected remove failure".into()));
        }
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(key.to_string())),
        }
    }
}

// ========================================
// Metadata repository
// ========================================

#[derive(Default)]
pub struct FakeImageRepository {
    rows: Mutex<HashMap<String, Image>>,
    pub fail_save: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_update: AtomicBool,
}

impl FakeImageRepository {
    pub fn row(&self, id: &str) -> Option<Image> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set_status(&self, id: &str, status: ImageStatus) {
        if let Some(row) = self.rows.lock().unwrap().get_mut(id) {
            row.status = status;
        }
    }
}

#[async_trait]
impl ImageRepository for FakeImageRepository {
    async fn save(&self, image: &Image) -> Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(AppError::MetaWrite("injected save failure".into()));
        }
        self.rows
            .lock()
            .unwrap()
            .insert(image.id.clone(), image.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Image> {
        self.row(id)
            .ok_or_else(|| AppError::NotFound(format!("image {}", id)))
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::MetaWrite("injected delete failure".into()));
        }
        match self.rows.lock().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("image {}", id))),
        }
    }

    async fn update_processed(&self, id: &str, processed_key: &str) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::MetaWrite("injected update failure".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("image {}", id)))?;
        row.status = ImageStatus::Done;
        row.processed_object_key = processed_key.to_string();
        Ok(())
    }
}

// ========================================
// Task publisher
// ========================================

#[derive(Default)]
pub struct FakePublisher {
    published: Mutex<Vec<TaskMessage>>,
    pub fail: AtomicBool,
}

impl FakePublisher {
    pub fn published(&self) -> Vec<TaskMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskPublisher for FakePublisher {
    async fn publish(&self, image_id: &str, actions: &[Action]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::BusPublish("injected broker outage".into()));
        }
        self.published
            .lock()
            .unwrap()
            .push(TaskMessage::new(image_id, actions));
        Ok(())
    }
}

// ========================================
// Subscription
// ========================================

/// Queue-backed subscription. `fetch` waits until a message is pushed.
#[derive(Default)]
pub struct FakeSubscription {
    queue: Mutex<VecDeque<Delivery>>,
    notify: Notify,
    next_offset: AtomicUsize,
    committed: Mutex<Vec<i64>>,
    /// Number of upcoming fetches that fail
    pub failing_fetches: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeSubscription {
    /// Enqueue a payload and return its offset
    pub fn push(&self, payload: impl Into<Vec<u8>>) -> i64 {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst) as i64;
        self.queue.lock().unwrap().push_back(Delivery {
            payload: payload.into(),
            topic: "image-tasks".to_string(),
            partition: 0,
            offset,
        });
        self.notify.notify_one();
        offset
    }

    pub fn push_task(&self, task: &TaskMessage) -> i64 {
        self.push(serde_json::to_vec(task).unwrap())
    }

    pub fn committed(&self) -> Vec<i64> {
        let mut offsets = self.committed.lock().unwrap().clone();
        offsets.sort_unstable();
        offsets
    }
}

#[async_trait]
impl TaskSubscription for FakeSubscription {
    async fn fetch(&self) -> Result<Delivery> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::BusConsume("injected fetch failure".into()));
        }

        loop {
            if let Some(delivery) = self.queue.lock().unwrap().pop_front() {
                return Ok(delivery);
            }
            self.notify.notified().await;
        }
    }

    async fn commit(&self, delivery: &Delivery) -> Result<()> {
        self.committed.lock().unwrap().push(delivery.offset);
        Ok(())
    }
}

// ========================================
// Wiring and fixtures
// ========================================

pub struct Harness {
    pub blobs: Arc<FakeBlobStore>,
    pub repo: Arc<FakeImageRepository>,
    pub publisher: Arc<FakePublisher>,
    pub service: ImageService,
    pub processor: TaskProcessor,
}

impl Harness {
    pub fn new() -> Self {
        let blobs = Arc::new(FakeBlobStore::default());
        let repo = Arc::new(FakeImageRepository::default());
        let publisher = Arc::new(FakePublisher::default());

        let service = ImageService::new(blobs.clone(), repo.clone(), publisher.clone());
        let processor = TaskProcessor::new(blobs.clone(), repo.clone());

        Self {
            blobs,
            repo,
            publisher,
            service,
            processor,
        }
    }

    /// Run every published task through the processor, oldest first
    pub async fn drain_tasks(&self) {
        for task in self.publisher.published() {
            self.processor.process(&task).await.unwrap();
        }
    }
}

/// Encoded test image with a simple gradient
pub fn test_image(width: u32, height: u32, format: ImageOutputFormat) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    Bytes::from(buf)
}

pub fn jpeg(width: u32, height: u32) -> Bytes {
    test_image(width, height, ImageOutputFormat::Jpeg(90))
}

pub fn png(width: u32, height: u32) -> Bytes {
    test_image(width, height, ImageOutputFormat::Png)
}
