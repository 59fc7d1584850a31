//! Kafka client access
//!
//! Producing records and reading partition watermarks are the only two
//! things the orchestrator needs from a real client. Both sit behind traits
//! so the benchmark harness can run against in-memory doubles.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(600);
const WATERMARK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Client task failed: {0}")]
    Task(String),
}

/// Delivery counts for one batch of produced records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProduceReport {
    pub delivered: u64,
    pub failed: u64,
}

impl ProduceReport {
    pub fn merge(self, other: ProduceReport) -> ProduceReport {
        ProduceReport {
            delivered: self.delivered + other.delivered,
            failed: self.failed + other.failed,
        }
    }
}

// ============================================================================
// SBIO: Traits for abstraction (allows mocking in tests)
// ============================================================================

#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Send every payload to `topic`, logging progress every
    /// `progress_every` queued records, and wait for delivery
    async fn produce(
        &self,
        topic: &str,
        payloads: Vec<Vec<u8>>,
        progress_every: usize,
    ) -> Result<ProduceReport, ClientError>;
}

#[async_trait]
pub trait WatermarkSource: Send + Sync {
    /// `(low, high)` offsets of one topic-partition
    async fn watermarks(&self, topic: &str, partition: i32) -> Result<(i64, i64), ClientError>;
}

// ============================================================================
// SBIO: I/O implementation (librdkafka)
// ============================================================================

/// Real client bound to a cluster's broker list
///
/// Producers and consumers are created per call and dropped afterwards.
#[derive(Debug, Clone)]
pub struct KafkaClient {
    bootstrap_servers: String,
}

impl KafkaClient {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
        }
    }

    fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("acks", "all")
            .set("retries", "5")
            .set("message.timeout.ms", "600000");
        config
    }

    fn consumer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", format!("kraftlab-watermarks-{}", Uuid::new_v4()))
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false");
        config
    }
}

#[async_trait]
impl RecordSink for KafkaClient {
    async fn produce(
        &self,
        topic: &str,
        payloads: Vec<Vec<u8>>,
        progress_every: usize,
    ) -> Result<ProduceReport, ClientError> {
        let producer: FutureProducer = self.producer_config().create()?;
        let total = payloads.len();
        let mut report = ProduceReport::default();
        let mut deliveries = Vec::with_capacity(total);

        for (i, payload) in payloads.iter().enumerate() {
            let record = FutureRecord::<(), _>::to(topic).payload(payload);
            match producer.send_result(record) {
                Ok(delivery) => deliveries.push(delivery),
                Err((e, _)) => {
                    warn!("Message delivery failed: {}", e);
                    report.failed += 1;
                }
            }
            if progress_every > 0 && (i + 1) % progress_every == 0 {
                info!("{}/{} messages queued.", i + 1, total);
            }
        }

        producer.flush(Timeout::After(FLUSH_TIMEOUT))?;

        for result in futures::future::join_all(deliveries).await {
            match result {
                Ok(Ok(_)) => report.delivered += 1,
                Ok(Err((e, _))) => {
                    warn!("Message delivery failed: {}", e);
                    report.failed += 1;
                }
                Err(_) => {
                    warn!("Message delivery was cancelled");
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Produced to {}: {} delivered, {} failed",
            topic, report.delivered, report.failed
        );
        Ok(report)
    }
}

#[async_trait]
impl WatermarkSource for KafkaClient {
    async fn watermarks(&self, topic: &str, partition: i32) -> Result<(i64, i64), ClientError> {
        let config = self.consumer_config();
        let topic = topic.to_string();

        // fetch_watermarks blocks on a broker round-trip
        tokio::task::spawn_blocking(move || -> Result<(i64, i64), ClientError> {
            let consumer: BaseConsumer = config.create()?;
            let offsets = consumer.fetch_watermarks(&topic, partition, WATERMARK_TIMEOUT)?;
            Ok(offsets)
        })
        .await
        .map_err(|e| ClientError::Task(e.to_string()))?
    }
}

// ============================================================================
// SBIO: Mock implementation for testing (no broker)
// ============================================================================
