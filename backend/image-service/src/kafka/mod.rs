//! Kafka task bus
//!
//! The API publishes one [`TaskMessage`](crate::models::TaskMessage) per upload;
//! the worker pool consumes them with manual offset commits.

pub mod consumer;
pub mod producer;

pub use consumer::{
    Delivery, KafkaTaskSubscription, MessageHandler, TaskSubscription, WorkerPool,
    WorkerPoolConfig,
};
pub use producer::{KafkaTaskProducer, TaskPublisher};
