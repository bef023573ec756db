/// Image Service - HTTP Server
///
/// Accepts uploads, serves processed images and cascades deletes.
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use image_service::db::{self, PgImageRepository};
use image_service::kafka::KafkaTaskProducer;
use image_service::services::ImageService;
use image_service::storage::S3BlobStore;
use image_service::{handlers, middleware, Config};
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    image_service::init_tracing();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;
    let bind_address = config.app.bind_address();

    tracing::info!(
        bind_address = %bind_address,
        bucket = %config.storage.bucket,
        topic = %config.kafka.task_topic,
        "Image service starting"
    );

    let blobs = S3BlobStore::connect(config.storage.clone())
        .await
        .context("object storage initialization failed")?;

    let master = db::connect_pool(&config.database.master_dsn, config.database.max_connections)
        .await
        .context("database initialization failed")?;
    db::run_migrations(&master)
        .await
        .context("database migration failed")?;

    let replica = match &config.database.slave_dsn {
        Some(dsn) => Some(
            db::connect_pool(dsn, config.database.max_connections)
                .await
                .context("read replica initialization failed")?,
        ),
        None => None,
    };

    let producer = Arc::new(
        KafkaTaskProducer::new(&config.kafka.brokers, &config.kafka.task_topic)
            .context("Kafka producer initialization failed")?,
    );

    // Topic bootstrap must not hold up the listener
    let bootstrap = producer.clone();
    tokio::spawn(async move {
        if let Err(e) = bootstrap.ensure_topic().await {
            tracing::warn!(topic = %bootstrap.topic(), error = %e, "Topic bootstrap failed");
        }
    });

    let service = web::Data::new(ImageService::new(
        Arc::new(blobs),
        Arc::new(PgImageRepository::new(master.clone(), replica)),
        producer,
    ));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::Cors)
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .client_request_timeout(Duration::from_secs(60))
    .client_disconnect_timeout(Duration::from_secs(60))
    .keep_alive(Duration::from_secs(300))
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run();

    tracing::info!("HTTP server is running");
    server.await.context("HTTP server error")?;

    master.close().await;
    tracing::info!("Image service stopped");
    Ok(())
}
