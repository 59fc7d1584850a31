//! Topic administration and measurement
//!
//! Creating and describing topics goes through `kafka-topics.sh`; a failing
//! call is reported, never raised. Two measurements are offered and they use
//! different sources of truth: [`TopicAdmin::partition_byte_size`] scans the
//! nodes' log directories on this host, while
//! [`TopicAdmin::partition_message_count`] asks the brokers for watermarks.
//! They can disagree once retention or compaction has run.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{ClientError, WatermarkSource};
use crate::config::{Topology, Workspace};
use crate::runtime::command::{CommandOutput, ToolError};
use crate::runtime::kafka::KafkaTools;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Failed to read watermarks for {topic}-{partition}: {source}")]
    Watermarks {
        topic: String,
        partition: i32,
        #[source]
        source: ClientError,
    },
}

/// Topic to create; owned by the cluster once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u16,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, partitions: u32, replication_factor: u16) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
        }
    }
}

/// Result of an admin script call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    Ok { output: String },
    Failed { code: Option<i32>, message: String },
}

impl AdminOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, AdminOutcome::Ok { .. })
    }

    fn from_command(action: &str, result: Result<CommandOutput, ToolError>) -> Self {
        match result {
            Ok(output) if output.success() => AdminOutcome::Ok {
                output: output.stdout,
            },
            Ok(output) => {
                warn!("{} rc={:?} err={}", action, output.code, output.stderr.trim());
                AdminOutcome::Failed {
                    code: output.code,
                    message: output.stderr.trim().to_string(),
                }
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                AdminOutcome::Failed {
                    code: None,
                    message: e.to_string(),
                }
            }
        }
    }
}

pub struct TopicAdmin {
    tools: KafkaTools,
    topology: Topology,
    workspace: Workspace,
    watermarks: Arc<dyn WatermarkSource>,
}

impl TopicAdmin {
    pub fn new(
        tools: KafkaTools,
        topology: Topology,
        workspace: Workspace,
        watermarks: Arc<dyn WatermarkSource>,
    ) -> Self {
        Self {
            tools,
            topology,
            workspace,
            watermarks,
        }
    }

    pub async fn create_topic(&self, spec: &TopicSpec) -> AdminOutcome {
        let result = self
            .tools
            .create_topic(
                &spec.name,
                spec.partitions,
                spec.replication_factor,
                &self.topology.first_broker(),
            )
            .await;
        AdminOutcome::from_command(&format!("Create topic '{}'", spec.name), result)
    }

    pub async fn describe_topic(&self, name: &str) -> AdminOutcome {
        let result = self
            .tools
            .describe_topic(name, &self.topology.first_broker())
            .await;
        AdminOutcome::from_command(&format!("Describe topic '{}'", name), result)
    }

    /// Total bytes of `*.log` segments for one partition across every
    /// node's log directory on this host
    pub fn partition_byte_size(&self, topic: &str, partition: u32) -> u64 {
        let dir_name = format!("{}-{}", topic, partition);
        self.topology
            .node_ids()
            .map(|n| segment_bytes(&self.workspace.node_data_dir(n).join(&dir_name)))
            .sum()
    }

    /// `high - low` watermark of one partition
    pub async fn partition_message_count(
        &self,
        topic: &str,
        partition: i32,
    ) -> Result<i64, AdminError> {
        let (low, high) = self
            .watermarks
            .watermarks(topic, partition)
            .await
            .map_err(|source| AdminError::Watermarks {
                topic: topic.to_string(),
                partition,
                source,
            })?;
        debug!("{}-{} watermarks low={} high={}", topic, partition, low, high);
        Ok(high - low)
    }
}

fn segment_bytes(partition_dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(partition_dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}
