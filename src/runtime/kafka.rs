//! Kafka admin script invocation
//!
//! Argument generation for the scripts shipped in a Kafka installation's
//! `bin/` directory, plus [`KafkaTools`], which runs them through a
//! [`CommandRunner`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::command::{CommandOutput, CommandRunner, ToolError};

pub const STORAGE_SCRIPT: &str = "kafka-storage.sh";
pub const SERVER_START_SCRIPT: &str = "kafka-server-start.sh";
pub const QUORUM_SCRIPT: &str = "kafka-metadata-quorum.sh";
pub const TOPICS_SCRIPT: &str = "kafka-topics.sh";
pub const PRODUCER_PERF_SCRIPT: &str = "kafka-producer-perf-test.sh";

/// Parameters of one `kafka-producer-perf-test.sh` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfTestParams {
    pub topic: String,
    pub num_records: u64,
    pub record_size: u64,
    /// Records per second; `-1` disables throttling
    pub throughput: i64,
    pub batch_size: u64,
    pub linger_ms: u64,
    pub compression: String,
}

impl PerfTestParams {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            num_records: 500,
            record_size: 256,
            throughput: -1,
            batch_size: 16_384,
            linger_ms: 5,
            compression: "none".to_string(),
        }
    }
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

pub fn random_uuid_args() -> Vec<String> {
    vec!["random-uuid".to_string()]
}

pub fn format_args(cluster_id: &str, config_path: &Path) -> Vec<String> {
    vec![
        "format".to_string(),
        "-t".to_string(),
        cluster_id.to_string(),
        "-c".to_string(),
        config_path.display().to_string(),
    ]
}

pub fn server_start_args(config_path: &Path) -> Vec<String> {
    vec![config_path.display().to_string()]
}

pub fn quorum_status_args(controller: &str) -> Vec<String> {
    vec![
        "--bootstrap-controller".to_string(),
        controller.to_string(),
        "describe".to_string(),
        "--status".to_string(),
    ]
}

pub fn create_topic_args(
    topic: &str,
    partitions: u32,
    replication_factor: u16,
    bootstrap: &str,
) -> Vec<String> {
    vec![
        "--create".to_string(),
        "--topic".to_string(),
        topic.to_string(),
        "--partitions".to_string(),
        partitions.to_string(),
        "--replication-factor".to_string(),
        replication_factor.to_string(),
        "--bootstrap-server".to_string(),
        bootstrap.to_string(),
    ]
}

pub fn describe_topic_args(topic: &str, bootstrap: &str) -> Vec<String> {
    vec![
        "--describe".to_string(),
        "--topic".to_string(),
        topic.to_string(),
        "--bootstrap-server".to_string(),
        bootstrap.to_string(),
    ]
}

/// Arguments for the producer perf test; the broker list is injected as a
/// producer property
pub fn producer_perf_args(params: &PerfTestParams, bootstrap_servers: &str) -> Vec<String> {
    vec![
        "--topic".to_string(),
        params.topic.clone(),
        "--num-records".to_string(),
        params.num_records.to_string(),
        "--record-size".to_string(),
        params.record_size.to_string(),
        "--throughput".to_string(),
        params.throughput.to_string(),
        "--producer-props".to_string(),
        "acks=all".to_string(),
        format!("batch.size={}", params.batch_size),
        format!("linger.ms={}", params.linger_ms),
        format!("compression.type={}", params.compression),
        format!("bootstrap.servers={}", bootstrap_servers),
    ]
}

/// Leader id reported by `kafka-metadata-quorum.sh describe --status`
///
/// Returns `None` unless a `LeaderId:` line carries a non-negative id.
pub fn parse_leader_id(status_output: &str) -> Option<i64> {
    status_output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "LeaderId" {
            return None;
        }
        value.trim().parse::<i64>().ok().filter(|id| *id >= 0)
    })
}

// ============================================================================
// SBIO: I/O implementation
// ============================================================================

/// Handle on a Kafka installation's admin scripts
#[derive(Clone)]
pub struct KafkaTools {
    bin_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl KafkaTools {
    pub fn new(kafka_dir: impl AsRef<Path>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            bin_dir: kafka_dir.as_ref().join("bin"),
            runner,
        }
    }

    pub fn script(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    async fn run(&self, script: &str, args: Vec<String>) -> Result<CommandOutput, ToolError> {
        self.runner.run(&self.script(script), &args).await
    }

    /// Generate a fresh cluster identifier
    pub async fn random_uuid(&self) -> Result<String, ToolError> {
        let output = self
            .run(STORAGE_SCRIPT, random_uuid_args())
            .await?
            .into_success(STORAGE_SCRIPT)?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn format_storage(
        &self,
        cluster_id: &str,
        config_path: &Path,
    ) -> Result<CommandOutput, ToolError> {
        self.run(STORAGE_SCRIPT, format_args(cluster_id, config_path))
            .await
    }

    pub async fn quorum_status(&self, controller: &str) -> Result<CommandOutput, ToolError> {
        self.run(QUORUM_SCRIPT, quorum_status_args(controller)).await
    }

    pub async fn create_topic(
        &self,
        topic: &str,
        partitions: u32,
        replication_factor: u16,
        bootstrap: &str,
    ) -> Result<CommandOutput, ToolError> {
        self.run(
            TOPICS_SCRIPT,
            create_topic_args(topic, partitions, replication_factor, bootstrap),
        )
        .await
    }

    pub async fn describe_topic(
        &self,
        topic: &str,
        bootstrap: &str,
    ) -> Result<CommandOutput, ToolError> {
        self.run(TOPICS_SCRIPT, describe_topic_args(topic, bootstrap))
            .await
    }

    pub async fn producer_perf_test(
        &self,
        params: &PerfTestParams,
        bootstrap_servers: &str,
    ) -> Result<CommandOutput, ToolError> {
        self.run(
            PRODUCER_PERF_SCRIPT,
            producer_perf_args(params, bootstrap_servers),
        )
        .await
    }
}
