//! Task producer
//!
//! Publishes image tasks keyed by image id so every task for one image lands
//! on the same partition.

use crate::error::{AppError, Result};
use crate::models::{Action, TaskMessage};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use resilience::{presets, with_timeout};
use std::time::Duration;
use tracing::{debug, error, info};

const TOPIC_PARTITIONS: i32 = 3;
const TOPIC_REPLICATION: i32 = 1;

#[async_trait]
pub trait TaskPublisher: Send + Sync {
    /// Publish a task for `image_id`; any transport or deadline failure is
    /// [`AppError::BusPublish`]
    async fn publish(&self, image_id: &str, actions: &[Action]) -> Result<()>;
}

pub struct KafkaTaskProducer {
    producer: FutureProducer,
    brokers: String,
    topic: String,
    publish_timeout: Duration,
}

impl KafkaTaskProducer {
    /// Create a producer that waits for the partition leader's acknowledgement
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", "1")
            .set("partitioner", "consistent_random")
            .set("request.timeout.ms", "10000")
            .set("message.timeout.ms", "30000")
            .set("linger.ms", "5")
            .create()
            .map_err(|e| AppError::Unavailable(format!("Failed to create Kafka producer: {e}")))?;

        info!(brokers = %brokers, topic = %topic, "Kafka task producer initialized");

        Ok(Self {
            producer,
            brokers: brokers.to_string(),
            topic: topic.to_string(),
            publish_timeout: presets::bus_publish_timeout().duration,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Create the task topic (3 partitions, replication factor 1).
    /// A topic that already exists is not an error.
    pub async fn ensure_topic(&self) -> Result<()> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("request.timeout.ms", "10000")
            .create()
            .map_err(|e| AppError::Unavailable(format!("Failed to create Kafka admin client: {e}")))?;

        let topic = NewTopic::new(
            &self.topic,
            TOPIC_PARTITIONS,
            TopicReplication::Fixed(TOPIC_REPLICATION),
        );
        let options = AdminOptions::new().operation_timeout(Some(Duration::from_secs(10)));

        let results = admin
            .create_topics(&[topic], &options)
            .await
            .map_err(|e| AppError::BusPublish(format!("create topic {}: {e}", self.topic)))?;

        for result in results {
            match result {
                Ok(name) => info!(topic = %name, "Kafka topic created"),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!(topic = %name, "Kafka topic already exists")
                }
                Err((name, code)) => {
                    return Err(AppError::BusPublish(format!(
                        "create topic {name}: {code}"
                    )))
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TaskPublisher for KafkaTaskProducer {
    async fn publish(&self, image_id: &str, actions: &[Action]) -> Result<()> {
        let task = TaskMessage::new(image_id, actions);
        let payload = serde_json::to_string(&task)
            .map_err(|e| AppError::BusPublish(format!("Serialization error: {e}")))?;

        let record = FutureRecord::to(&self.topic).key(image_id).payload(&payload);

        let delivery = with_timeout(
            self.publish_timeout,
            self.producer.send(record, self.publish_timeout),
        )
        .await
        .map_err(|_| {
            AppError::BusPublish(format!(
                "publish deadline of {:?} exceeded",
                self.publish_timeout
            ))
        })?;

        match delivery {
            Ok((partition, offset)) => {
                info!(
                    image_id = %image_id,
                    partition = partition,
                    offset = offset,
                    "Published image task"
                );
                Ok(())
            }
            Err((err, _)) => {
                error!(image_id = %image_id, error = %err, "Failed to publish image task");
                Err(AppError::BusPublish(err.to_string()))
            }
        }
    }
}
