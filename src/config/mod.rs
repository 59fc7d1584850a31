//! Cluster configuration
//!
//! This module holds the validated settings for one local cluster, the
//! on-disk workspace layout derived from them, the port topology, and the
//! per-node broker configuration generator.

pub mod node;
pub mod topology;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use node::{ConfigError, ConfigGenerator, NodeConfig};
pub use topology::Topology;

/// Default number of nodes in a local cluster
pub const DEFAULT_NODES: u16 = 3;

/// Default first data-plane (broker) port
pub const DEFAULT_BASE_PORT: u16 = 9092;

/// Default first control-plane (controller) port
pub const DEFAULT_BASE_CONTROLLER_PORT: u16 = 9029;

/// Default time allowed for the controllers to elect a leader
pub const DEFAULT_QUORUM_TIMEOUT_SECS: u64 = 60;

/// Default delay between consecutive quorum polling rounds
pub const DEFAULT_QUORUM_POLL_INTERVAL_MS: u64 = 1000;

/// Default delay between consecutive node spawns
pub const DEFAULT_SPAWN_STAGGER_MS: u64 = 500;

/// Errors raised while validating cluster settings
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Cluster must have at least one node")]
    NoNodes,

    #[error("Cluster name must not be empty")]
    EmptyClusterName,

    #[error("Port range starting at {base} cannot hold {nodes} nodes")]
    PortOverflow { base: u16, nodes: u16 },

    #[error("Broker ports {broker:?} overlap controller ports {controller:?}")]
    PortOverlap {
        broker: (u16, u16),
        controller: (u16, u16),
    },
}

/// Validated settings for one local cluster
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    /// Kafka installation root (the directory containing `bin/`)
    pub kafka_dir: PathBuf,
    /// Parent directory for workspaces
    pub workdir: PathBuf,
    /// Cluster name; also the workspace directory name
    pub cluster_name: String,
    /// Port layout for every node
    pub topology: Topology,
    /// How long `start` waits for a leader before rolling back
    pub quorum_timeout: Duration,
    /// Sleep between quorum polling rounds
    pub quorum_poll_interval: Duration,
    /// Sleep between consecutive node spawns
    pub spawn_stagger: Duration,
}

impl ClusterSettings {
    /// Create settings with default ports and timings
    pub fn new(
        kafka_dir: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        cluster_name: impl Into<String>,
    ) -> Result<Self, SettingsError> {
        let topology = Topology::new(DEFAULT_NODES, DEFAULT_BASE_PORT, DEFAULT_BASE_CONTROLLER_PORT)?;
        let cluster_name = cluster_name.into();
        if cluster_name.trim().is_empty() {
            return Err(SettingsError::EmptyClusterName);
        }

        Ok(Self {
            kafka_dir: kafka_dir.into(),
            workdir: workdir.into(),
            cluster_name,
            topology,
            quorum_timeout: Duration::from_secs(DEFAULT_QUORUM_TIMEOUT_SECS),
            quorum_poll_interval: Duration::from_millis(DEFAULT_QUORUM_POLL_INTERVAL_MS),
            spawn_stagger: Duration::from_millis(DEFAULT_SPAWN_STAGGER_MS),
        })
    }

    /// Replace the port topology
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the quorum timeout
    pub fn with_quorum_timeout(mut self, timeout: Duration) -> Self {
        self.quorum_timeout = timeout;
        self
    }

    /// Set the quorum poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.quorum_poll_interval = interval;
        self
    }

    /// Set the inter-spawn delay
    pub fn with_spawn_stagger(mut self, stagger: Duration) -> Self {
        self.spawn_stagger = stagger;
        self
    }

    /// Workspace layout for these settings
    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.workdir.join(&self.cluster_name))
    }

    /// Path of a script in the Kafka installation's `bin/` directory
    pub fn kafka_bin(&self, name: &str) -> PathBuf {
        self.kafka_dir.join("bin").join(name)
    }
}

/// Expand `~` and environment references in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::full(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(raw).into_owned());
    let path = PathBuf::from(expanded);
    std::fs::canonicalize(&path).unwrap_or(path)
}

// ============================================================================
// Workspace layout
// ============================================================================

/// On-disk layout of one cluster workspace
///
/// ```text
/// <root>/config/broker-{n}.properties
/// <root>/data/kraft-combined-logs-{n}/
/// <root>/logs/broker-{n}.log
/// <root>/processes.json
/// <root>/state.json
/// <root>/cluster.id
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Persisted process registry
    pub fn registry_file(&self) -> PathBuf {
        self.root.join("processes.json")
    }

    /// Persisted lifecycle state
    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Persisted cluster identifier
    pub fn cluster_id_file(&self) -> PathBuf {
        self.root.join("cluster.id")
    }

    pub fn node_config_path(&self, node_id: u16) -> PathBuf {
        self.config_dir().join(format!("broker-{}.properties", node_id))
    }

    pub fn node_data_dir(&self, node_id: u16) -> PathBuf {
        self.data_dir().join(format!("kraft-combined-logs-{}", node_id))
    }

    pub fn node_log_path(&self, node_id: u16) -> PathBuf {
        self.logs_dir().join(format!("broker-{}.log", node_id))
    }

    /// Create the workspace directory tree if missing
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.root.clone(),
            self.config_dir(),
            self.data_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = ClusterSettings::new("/opt/kafka", "/tmp/labs", "lab1").unwrap();
        assert_eq!(settings.topology.node_count(), 3);
        assert_eq!(settings.quorum_timeout, Duration::from_secs(60));
        assert_eq!(settings.quorum_poll_interval, Duration::from_secs(1));
        assert_eq!(settings.spawn_stagger, Duration::from_millis(500));
    }

    #[test]
    fn test_empty_cluster_name_rejected() {
        let result = ClusterSettings::new("/opt/kafka", "/tmp/labs", "  ");
        assert_eq!(result.unwrap_err(), SettingsError::EmptyClusterName);
    }

    #[test]
    fn test_workspace_is_nested_under_cluster_name() {
        let settings = ClusterSettings::new("/opt/kafka", "/tmp/labs", "lab1").unwrap();
        let ws = settings.workspace();
        assert_eq!(ws.root(), Path::new("/tmp/labs/lab1"));
        assert_eq!(
            ws.node_config_path(2),
            PathBuf::from("/tmp/labs/lab1/config/broker-2.properties")
        );
        assert_eq!(
            ws.node_data_dir(3),
            PathBuf::from("/tmp/labs/lab1/data/kraft-combined-logs-3")
        );
        assert_eq!(ws.node_log_path(1), PathBuf::from("/tmp/labs/lab1/logs/broker-1.log"));
        assert_eq!(ws.registry_file(), PathBuf::from("/tmp/labs/lab1/processes.json"));
        assert_eq!(ws.cluster_id_file(), PathBuf::from("/tmp/labs/lab1/cluster.id"));
    }

    #[test]
    fn test_kafka_bin() {
        let settings = ClusterSettings::new("/opt/kafka", "/tmp/labs", "lab1").unwrap();
        assert_eq!(
            settings.kafka_bin("kafka-storage.sh"),
            PathBuf::from("/opt/kafka/bin/kafka-storage.sh")
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path().join("c1"));
        ws.ensure_dirs().unwrap();
        assert!(ws.config_dir().is_dir());
        assert!(ws.data_dir().is_dir());
        assert!(ws.logs_dir().is_dir());
    }

    #[test]
    fn test_expand_path_keeps_plain_paths() {
        assert_eq!(
            expand_path("/definitely/not/a/real/dir"),
            PathBuf::from("/definitely/not/a/real/dir")
        );
    }
}
