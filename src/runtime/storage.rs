//! Storage formatting
//!
//! Formats every node's log directory with the shared cluster id. A node
//! that fails to format is reported and skipped; the remaining nodes are
//! still formatted and the cluster may still be started.

use tracing::{info, warn};

use crate::config::NodeConfig;

use super::kafka::KafkaTools;

/// A node whose storage could not be formatted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatWarning {
    pub node_id: u16,
    pub code: Option<i32>,
    pub message: String,
}

/// Outcome of formatting every node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatReport {
    pub formatted: Vec<u16>,
    pub warnings: Vec<FormatWarning>,
}

impl FormatReport {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct StorageFormatter {
    tools: KafkaTools,
}

impl StorageFormatter {
    pub fn new(tools: KafkaTools) -> Self {
        Self { tools }
    }

    /// Format each node in order with `cluster_id`
    pub async fn format_all(&self, configs: &[NodeConfig], cluster_id: &str) -> FormatReport {
        let mut report = FormatReport::default();

        for config in configs {
            match self
                .tools
                .format_storage(cluster_id, &config.config_path)
                .await
            {
                Ok(output) if output.success() => {
                    info!("Formatted node {}", config.node_id);
                    report.formatted.push(config.node_id);
                }
                Ok(output) => {
                    warn!(
                        "Formatting node {} returned {:?}\nstdout={}\nstderr={}",
                        config.node_id, output.code, output.stdout, output.stderr
                    );
                    report.warnings.push(FormatWarning {
                        node_id: config.node_id,
                        code: output.code,
                        message: output.stderr.trim().to_string(),
                    });
                }
                Err(e) => {
                    warn!("Formatting node {} failed: {}", config.node_id, e);
                    report.warnings.push(FormatWarning {
                        node_id: config.node_id,
                        code: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
