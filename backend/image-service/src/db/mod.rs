/// Metadata store gateway
///
/// This module provides:
/// - Postgres pool construction with startup retry
/// - Embedded schema migrations
/// - The [`ImageRepository`] contract and its Postgres implementation
use crate::error::{AppError, Result};
use crate::models::Image;
use async_trait::async_trait;
use resilience::{presets, with_retry};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

pub mod image_repo;

pub use image_repo::PgImageRepository;

#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert, or replace every column when the id already exists
    async fn save(&self, image: &Image) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Image>;

    /// [`AppError::NotFound`] when no row was deleted
    async fn delete_by_id(&self, id: &str) -> Result<()>;

    /// Mark the image Done and point it at its processed object
    async fn update_processed(&self, id: &str, processed_key: &str) -> Result<()>;
}

/// Open a pool, retrying the initial connection (10 attempts, 3s apart)
pub async fn connect_pool(dsn: &str, max_connections: u32) -> Result<PgPool> {
    let pool = with_retry(presets::database_connect(), || async move {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(dsn)
            .await
    })
    .await
    .map_err(|e| AppError::Unavailable(format!("database: {}", e)))?;

    info!(max_connections, "Database pool connected");
    Ok(pool)
}

/// Apply embedded migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Unavailable(format!("migrations failed: {}", e)))?;

    info!("Database migrations applied");
    Ok(())
}
