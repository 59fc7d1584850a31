//! Per-node broker configuration
//!
//! Every node runs in combined `broker,controller` mode. The quorum voter
//! list is identical in every file because KRaft membership must be known
//! statically before storage is formatted.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::{Topology, Workspace};

/// Errors that can occur while writing node configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration of a single node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub node_id: u16,
    /// `listeners` value binding the data-plane and control-plane ports
    pub listeners: String,
    /// `advertised.listeners` value (data plane only)
    pub advertised_listeners: String,
    /// `controller.quorum.voters` value
    pub controller_quorum_voters: String,
    /// Log directory owned by this node
    pub storage_dir: PathBuf,
    /// Where the rendered properties file lives
    pub config_path: PathBuf,
}

impl NodeConfig {
    /// Ordered key/value pairs written to the properties file
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("process.roles", "broker,controller".to_string()),
            ("node.id", self.node_id.to_string()),
            ("controller.listener.names", "CONTROLLER".to_string()),
            ("controller.quorum.voters", self.controller_quorum_voters.clone()),
            ("listeners", self.listeners.clone()),
            (
                "listener.security.protocol.map",
                "CONTROLLER:PLAINTEXT,PLAINTEXT:PLAINTEXT".to_string(),
            ),
            ("inter.broker.listener.name", "PLAINTEXT".to_string()),
            ("advertised.listeners", self.advertised_listeners.clone()),
            ("log.dirs", self.storage_dir.display().to_string()),
            ("offsets.topic.replication.factor", "3".to_string()),
            ("transaction.state.log.replication.factor", "3".to_string()),
            ("transaction.state.log.min.isr", "2".to_string()),
        ]
    }

    /// Render the properties file body
    pub fn render(&self) -> String {
        self.properties()
            .into_iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()
    }
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Build the configuration of every node without touching the filesystem
pub fn build_node_configs(topology: &Topology, workspace: &Workspace) -> Vec<NodeConfig> {
    let voters = topology.quorum_voters();
    topology
        .node_ids()
        .map(|node_id| {
            let broker_port = topology.broker_port(node_id);
            let controller_port = topology.controller_port(node_id);
            NodeConfig {
                node_id,
                listeners: format!(
                    "PLAINTEXT://:{},CONTROLLER://:{}",
                    broker_port, controller_port
                ),
                advertised_listeners: format!("PLAINTEXT://{}", topology.broker_endpoint(node_id)),
                controller_quorum_voters: voters.clone(),
                storage_dir: workspace.node_data_dir(node_id),
                config_path: workspace.node_config_path(node_id),
            }
        })
        .collect()
}

// ============================================================================
// SBIO: I/O implementation
// ============================================================================

/// Writes one properties file per node into the workspace
pub struct ConfigGenerator {
    workspace: Workspace,
}

impl ConfigGenerator {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Render and write every node's config, overwriting existing files
    pub fn generate(&self, topology: &Topology) -> Result<Vec<NodeConfig>, ConfigError> {
        let configs = build_node_configs(topology, &self.workspace);
        let config_dir = self.workspace.config_dir();
        std::fs::create_dir_all(&config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.clone(),
            source,
        })?;

        for config in &configs {
            write_config(&config.config_path, &config.render())?;
            debug!("Wrote config for node {} to {:?}", config.node_id, config.config_path);
        }

        info!("Wrote {} broker config(s) into {}", configs.len(), config_dir.display());
        Ok(configs)
    }

    /// Configs as they would be generated, for commands that only read them
    pub fn existing(&self, topology: &Topology) -> Vec<NodeConfig> {
        build_node_configs(topology, &self.workspace)
    }
}

fn write_config(path: &Path, body: &str) -> Result<(), ConfigError> {
    std::fs::write(path, body).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
