/// Business logic for image-service
///
/// - `image_service`: upload, retrieve and delete orchestration for the API
/// - `task_processor`: per-message processing for the worker
/// - `processing`: the transformation pipeline both rely on
pub mod image_service;
pub mod processing;
pub mod task_processor;

pub use image_service::{ImageService, NewImage};
pub use processing::Pipeline;
pub use task_processor::TaskProcessor;
