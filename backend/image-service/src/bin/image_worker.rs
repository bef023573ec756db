//! Image Worker - Kafka consumer pool for image transformations
//!
//! Consumes tasks from the image task topic, applies the requested pipeline
//! and stores the processed rendition. Offsets are committed only after a
//! task succeeds.
//!
//! Environment variables:
//! - MASTER_DSN / SLAVE_DSN: Postgres connection strings
//! - MINIO_ENDPOINT, BUCKET_NAME, MINIO_ROOT_USER, MINIO_ROOT_PASSWORD: object storage
//! - KAFKA_BROKERS, KAFKA_TASK_TOPIC, KAFKA_CONSUMER_GROUP: task bus
//! - WORKER_CONCURRENCY: number of parallel workers (default: 5)

use anyhow::Context;
use image_service::db::{self, PgImageRepository};
use image_service::kafka::{KafkaTaskSubscription, WorkerPool, WorkerPoolConfig};
use image_service::services::TaskProcessor;
use image_service::storage::S3BlobStore;
use image_service::Config;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    image_service::init_tracing();

    info!("Starting Image Worker");

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;
    info!(
        bucket = %config.storage.bucket,
        kafka_brokers = %config.kafka.brokers,
        kafka_topic = %config.kafka.task_topic,
        group_id = %config.kafka.consumer_group,
        workers = config.worker.concurrency,
        "Configuration loaded"
    );

    let master = db::connect_pool(&config.database.master_dsn, config.database.max_connections)
        .await
        .context("database initialization failed")?;
    let replica = match &config.database.slave_dsn {
        Some(dsn) => Some(
            db::connect_pool(dsn, config.database.max_connections)
                .await
                .context("read replica initialization failed")?,
        ),
        None => None,
    };

    let blobs = S3BlobStore::connect(config.storage.clone())
        .await
        .context("object storage initialization failed")?;

    let processor = Arc::new(TaskProcessor::new(
        Arc::new(blobs),
        Arc::new(PgImageRepository::new(master.clone(), replica)),
    ));

    let subscription = Arc::new(
        KafkaTaskSubscription::new(
            &config.kafka.brokers,
            &config.kafka.task_topic,
            &config.kafka.consumer_group,
        )
        .context("Kafka consumer initialization failed")?,
    );

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let pool = WorkerPool::new(
        subscription,
        processor,
        WorkerPoolConfig {
            concurrency: config.worker.concurrency,
            ..Default::default()
        },
    );

    pool.run(shutdown_rx).await;

    master.close().await;
    info!("Image Worker stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
