//! Cluster lifecycle
//!
//! [`ClusterOrchestrator`] is the entry point. The lifecycle state machine,
//! the quorum probe and workspace cleanup live in their own modules so they
//! can be tested without an orchestrator.

pub mod cleanup;
pub mod lifecycle;
pub mod orchestrator;
pub mod quorum;

pub use cleanup::{remove_tree, CleanReport};
pub use lifecycle::{ClusterState, LifecycleError, LifecycleEvent, LifecycleStore};
pub use orchestrator::{
    CleanOutcome, ClusterOrchestrator, ClusterStatus, InitReport, OrchestratorError, StageReport,
    StartOutcome,
};
pub use quorum::{QuorumProbe, QuorumStatus};
