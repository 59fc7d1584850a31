//! kraftlab: local multi-node KRaft cluster orchestration and producer
//! benchmarking

pub mod admin;
pub mod bench;
pub mod cli;
pub mod client;
pub mod cluster;
pub mod config;
pub mod runtime;

pub use cluster::{ClusterOrchestrator, OrchestratorError};
pub use config::{ClusterSettings, Topology};
