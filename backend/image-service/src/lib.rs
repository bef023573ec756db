//! Image Service
//!
//! Accepts image uploads over HTTP, stores originals in S3-compatible storage,
//! records metadata in Postgres and hands transformation tasks to a Kafka
//! worker pool that writes processed renditions back to storage.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod kafka;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "image_service=debug,rdkafka=warn,info".into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
