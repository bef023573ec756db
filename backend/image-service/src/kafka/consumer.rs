//! Task consumer pool
//!
//! A fixed number of workers share one subscription. Each worker runs its own
//! fetch, handle, commit loop; a message is committed only after its handler
//! succeeds, so failures are redelivered on the next assignment.

use crate::error::{AppError, Result};
use crate::metrics::IMAGE_TASKS_PROCESSED_TOTAL;
use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use resilience::{presets, with_timeout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A fetched message, detached from the client buffer
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Shared subscription; `fetch` and `commit` may be called from many workers at once
#[async_trait]
pub trait TaskSubscription: Send + Sync {
    async fn fetch(&self) -> Result<Delivery>;

    async fn commit(&self, delivery: &Delivery) -> Result<()>;
}

/// Per-message processing step run by every worker
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<()>;
}

// ========================================
// Kafka subscription
// ========================================

pub struct KafkaTaskSubscription {
    consumer: StreamConsumer,
}

impl KafkaTaskSubscription {
    pub fn new(brokers: &str, topic: &str, group_id: &str) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "45000")
            .set("max.poll.interval.ms", "300000")
            .create()
            .map_err(|e| AppError::Unavailable(format!("Failed to create Kafka consumer: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| AppError::Unavailable(format!("Failed to subscribe to topic: {e}")))?;

        info!(
            brokers = %brokers,
            topic = %topic,
            group_id = %group_id,
            "Task subscription initialized"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl TaskSubscription for KafkaTaskSubscription {
    async fn fetch(&self) -> Result<Delivery> {
        let msg = self
            .consumer
            .recv()
            .await
            .map_err(|e| AppError::BusConsume(e.to_string()))?;

        Ok(Delivery {
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
        })
    }

    async fn commit(&self, delivery: &Delivery) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &delivery.topic,
            delivery.partition,
            Offset::Offset(delivery.offset + 1),
        )
        .map_err(|e| AppError::BusConsume(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| AppError::BusConsume(e.to_string()))
    }
}

// ========================================
// Worker pool
// ========================================

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub concurrency: usize,
    /// Pause after a failed fetch
    pub fetch_backoff: Duration,
    /// How long in-flight workers get to finish after shutdown
    pub shutdown_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            fetch_backoff: Duration::from_secs(1),
            shutdown_timeout: presets::worker_shutdown_timeout().duration,
        }
    }
}

pub struct WorkerPool {
    subscription: Arc<dyn TaskSubscription>,
    handler: Arc<dyn MessageHandler>,
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(
        subscription: Arc<dyn TaskSubscription>,
        handler: Arc<dyn MessageHandler>,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            subscription,
            handler,
            config,
        }
    }

    /// Run every worker until `shutdown` flips to true (or its sender is dropped),
    /// then wait up to the shutdown deadline before aborting stragglers.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut workers = JoinSet::new();

        for worker_id in 0..self.config.concurrency.max(1) {
            workers.spawn(run_worker(
                worker_id,
                self.subscription.clone(),
                self.handler.clone(),
                shutdown.clone(),
                self.config.fetch_backoff,
            ));
        }

        info!(workers = workers.len(), "Worker pool started");

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                joined = workers.join_next() => match joined {
                    Some(Err(e)) => error!(error = %e, "Worker task terminated abnormally"),
                    Some(Ok(())) => {}
                    None => {
                        warn!("All workers exited before shutdown");
                        return;
                    }
                },
            }
        }

        info!(
            in_flight = workers.len(),
            timeout = ?self.config.shutdown_timeout,
            "Draining worker pool"
        );

        let drain = async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Worker task terminated abnormally");
                }
            }
        };

        if with_timeout(self.config.shutdown_timeout, drain).await.is_err() {
            warn!("Shutdown deadline exceeded, aborting remaining workers");
            workers.abort_all();
        }

        info!("Worker pool stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    subscription: Arc<dyn TaskSubscription>,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: watch::Receiver<bool>,
    fetch_backoff: Duration,
) {
    debug!(worker_id, "Worker started");

    loop {
        let fetched = tokio::select! {
            _ = shutdown_requested(&mut shutdown) => break,
            fetched = subscription.fetch() => fetched,
        };

        let delivery = match fetched {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(worker_id, error = %e, "Fetch failed, backing off");
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => break,
                    _ = tokio::time::sleep(fetch_backoff) => continue,
                }
            }
        };

        match handler.handle(&delivery.payload).await {
            Ok(()) => {
                IMAGE_TASKS_PROCESSED_TOTAL
                    .with_label_values(&["success"])
                    .inc();
                if let Err(e) = subscription.commit(&delivery).await {
                    error!(
                        worker_id,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        error = %e,
                        "Failed to commit offset"
                    );
                }
            }
            Err(e) => {
                IMAGE_TASKS_PROCESSED_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                warn!(
                    worker_id,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    error = %e,
                    "Processing failed, message left uncommitted"
                );
            }
        }
    }

    debug!(worker_id, "Worker stopped");
}

/// Resolves once shutdown is signalled or the sender is gone
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
