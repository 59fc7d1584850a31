//! CLI for kraftlab
//!
//! Lifecycle subcommands:
//! - `kraftlab init` - write node configs and format storage
//! - `kraftlab start` - spawn every node and wait for quorum
//! - `kraftlab stop` - terminate the nodes listed in the registry
//! - `kraftlab status` - show endpoints, lifecycle state and the registry
//! - `kraftlab clean` - stop, then delete the workspace
//!
//! Experiment stages `stg1`..`stg4` each run a full
//! init/start/run/stop/clean cycle.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::bench::Stage;
use crate::config::{
    expand_path, ClusterSettings, SettingsError, Topology, DEFAULT_BASE_CONTROLLER_PORT,
    DEFAULT_BASE_PORT, DEFAULT_NODES, DEFAULT_QUORUM_TIMEOUT_SECS,
};

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "kraftlab")]
#[command(about = "Run and benchmark a local multi-node KRaft cluster")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a .env file loaded before the options are read
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write node configs, create the cluster id and format storage
    Init(ClusterArgs),

    /// Start every node and wait for the controllers to elect a leader
    Start(ClusterArgs),

    /// Stop every node recorded in the registry
    Stop(ClusterArgs),

    /// Show workspace, endpoints, lifecycle state and process info
    Status(ClusterArgs),

    /// Stop the cluster and delete its workspace
    Clean(ClusterArgs),

    /// Create, describe and fill the main topic
    Stg1(StageArgs),

    /// Sweep producer batch size and linger
    Stg2(StageArgs),

    /// Sweep compression algorithms and measure on-disk size
    Stg3(StageArgs),

    /// Sweep partition counts and report per-partition message counts
    Stg4(StageArgs),
}

impl Commands {
    pub fn cluster_args(&self) -> &ClusterArgs {
        match self {
            Commands::Init(args)
            | Commands::Start(args)
            | Commands::Stop(args)
            | Commands::Status(args)
            | Commands::Clean(args) => args,
            Commands::Stg1(args)
            | Commands::Stg2(args)
            | Commands::Stg3(args)
            | Commands::Stg4(args) => &args.cluster,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Commands::Stg1(_) => Some(Stage::Basic),
            Commands::Stg2(_) => Some(Stage::BatchLinger),
            Commands::Stg3(_) => Some(Stage::Compression),
            Commands::Stg4(_) => Some(Stage::Partitions),
            _ => None,
        }
    }
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ClusterArgs {
    /// Kafka installation directory (contains bin/)
    #[arg(long, env = "KRAFTLAB_KAFKA_DIR")]
    pub kafka_dir: String,

    /// Parent directory for cluster workspaces
    #[arg(long, env = "KRAFTLAB_WORKDIR")]
    pub workdir: String,

    /// Cluster name; the workspace is <workdir>/<cluster-name>
    #[arg(long, env = "KRAFTLAB_CLUSTER_NAME")]
    pub cluster_name: String,

    /// Number of combined broker/controller nodes
    #[arg(long, env = "KRAFTLAB_NODES", default_value_t = DEFAULT_NODES)]
    pub nodes: u16,

    /// First broker (data-plane) port
    #[arg(long, env = "KRAFTLAB_BASE_PORT", default_value_t = DEFAULT_BASE_PORT)]
    pub base_port: u16,

    /// First controller (control-plane) port
    #[arg(long, env = "KRAFTLAB_BASE_CONTROLLER_PORT", default_value_t = DEFAULT_BASE_CONTROLLER_PORT)]
    pub base_controller_port: u16,

    /// Seconds to wait for a quorum leader before rolling back a start
    #[arg(long, env = "KRAFTLAB_QUORUM_TIMEOUT", value_name = "SECS", default_value_t = DEFAULT_QUORUM_TIMEOUT_SECS)]
    pub quorum_timeout: u64,
}

impl ClusterArgs {
    /// Validate into cluster settings, expanding `~` in paths
    pub fn to_settings(&self) -> Result<ClusterSettings, SettingsError> {
        let topology = Topology::new(self.nodes, self.base_port, self.base_controller_port)?;
        Ok(ClusterSettings::new(
            expand_path(&self.kafka_dir),
            expand_path(&self.workdir),
            self.cluster_name.clone(),
        )?
        .with_topology(topology)
        .with_quorum_timeout(Duration::from_secs(self.quorum_timeout)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Concurrent producer workers for generated records
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}

/// Find `--env-file` before clap runs, so the file can supply option values
pub fn env_file_from_args(args: &[String]) -> Option<PathBuf> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--env-file" {
            return iter.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--env-file=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
