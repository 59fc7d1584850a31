//! Cluster lifecycle state machine
//!
//! The current state is persisted to `state.json`, but file presence stays
//! the recovery signal after a crash: a registry file means the nodes are
//! believed running no matter what the state file says.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterState {
    Uninitialized,
    Configured,
    Formatted,
    Starting,
    Running,
    Stopping,
    Stopped,
    Removed,
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterState::Uninitialized => "uninitialized",
            ClusterState::Configured => "configured",
            ClusterState::Formatted => "formatted",
            ClusterState::Starting => "starting",
            ClusterState::Running => "running",
            ClusterState::Stopping => "stopping",
            ClusterState::Stopped => "stopped",
            ClusterState::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// Something that happened to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    ConfigsWritten,
    StorageFormatted,
    SpawnStarted,
    QuorumReached,
    QuorumFailed,
    StopRequested,
    StopCompleted,
    Cleaned,
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Cannot apply {event:?} while cluster is {state}")]
    IllegalTransition {
        state: ClusterState,
        event: LifecycleEvent,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to persist state to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Apply `event` to `state`, rejecting moves the lifecycle does not allow
pub fn transition(
    state: ClusterState,
    event: LifecycleEvent,
) -> Result<ClusterState, LifecycleError> {
    use ClusterState::*;
    use LifecycleEvent::*;

    let next = match (state, event) {
        // init may be re-run unless nodes are tracked as running
        (Starting | Running | Stopping, ConfigsWritten) => {
            return Err(LifecycleError::IllegalTransition { state, event })
        }
        (_, ConfigsWritten) => Configured,
        (Configured, StorageFormatted) => Formatted,
        (Formatted | Stopped, SpawnStarted) => Starting,
        (Starting, QuorumReached) => Running,
        // rollback goes through Stopping
        (Starting, QuorumFailed) => Stopping,
        (Starting | Running | Stopping, StopRequested) => Stopping,
        // the registry is gone once stop completes, so recovery may already
        // report Stopped
        (Stopping | Stopped, StopCompleted) => Stopped,
        (Uninitialized | Configured | Formatted | Stopped, Cleaned) => Removed,
        _ => return Err(LifecycleError::IllegalTransition { state, event }),
    };
    Ok(next)
}

/// Reconcile the persisted state with what is actually on disk
pub fn recover(
    persisted: Option<ClusterState>,
    configs_exist: bool,
    registry_exists: bool,
) -> ClusterState {
    if registry_exists {
        return match persisted {
            Some(state @ (ClusterState::Starting | ClusterState::Stopping)) => state,
            _ => ClusterState::Running,
        };
    }
    match persisted {
        // interrupted mid-flight, nothing is tracked as running
        Some(ClusterState::Starting | ClusterState::Running | ClusterState::Stopping) => {
            ClusterState::Stopped
        }
        Some(state) => state,
        None if configs_exist => ClusterState::Configured,
        None => ClusterState::Uninitialized,
    }
}

// ============================================================================
// SBIO: I/O implementation
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    state: ClusterState,
    updated_at: DateTime<Utc>,
}

/// Persisted lifecycle state of one workspace
pub struct LifecycleStore {
    workspace: Workspace,
}

impl LifecycleStore {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    fn read_persisted(&self) -> Option<ClusterState> {
        let path = self.workspace.state_file();
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<StateFile>(&content) {
            Ok(file) => Some(file.state),
            Err(e) => {
                warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Current state, inferred from the state file and workspace contents
    pub fn current(&self) -> ClusterState {
        if !self.workspace.root().exists() {
            return ClusterState::Uninitialized;
        }
        let configs_exist = self.workspace.node_config_path(1).exists();
        let registry_exists = self.workspace.registry_file().exists();
        recover(self.read_persisted(), configs_exist, registry_exists)
    }

    /// Validate and persist a transition, returning the new state
    pub fn apply(&self, event: LifecycleEvent) -> Result<ClusterState, LifecycleError> {
        let next = transition(self.current(), event)?;
        self.persist(next)?;
        Ok(next)
    }

    fn persist(&self, state: ClusterState) -> Result<(), LifecycleError> {
        let path = self.workspace.state_file();
        let file = StateFile {
            state,
            updated_at: Utc::now(),
        };
        let body = serde_json::to_string_pretty(&file)?;
        write_state(&path, &body)
    }
}

fn write_state(path: &Path, body: &str) -> Result<(), LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LifecycleError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, body).map_err(|source| LifecycleError::Io {
        path: path.to_path_buf(),
        source,
    })
}
