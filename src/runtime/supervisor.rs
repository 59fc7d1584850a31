//! Node process supervision
//!
//! Spawns one broker process per node, records it in the persisted
//! registry, and terminates whatever the registry lists. `stop_all` works
//! from a fresh invocation because it trusts only the registry file.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{NodeConfig, Workspace};

use super::kafka::server_start_args;
use super::registry::{ProcessRecord, ProcessRegistry, RegistryError};

/// Errors that can occur during supervisor operations
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to spawn node {node_id}: {reason}")]
    Spawn { node_id: u16, reason: String },

    #[error("Failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A freshly started process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedProcess {
    pub pid: u32,
    pub started_at: Option<u64>,
}

/// What happened when a recorded process was asked to terminate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// SIGTERM delivered
    Signalled,
    /// No such process (already exited)
    NotFound,
    /// The pid now belongs to a process started at a different time
    PidReused { recorded: u64, current: u64 },
}

// ============================================================================
// SBIO: Trait for abstraction (allows simulated launches in tests)
// ============================================================================

pub trait ProcessLauncher: Send + Sync {
    /// Start the broker for `config`, appending its output to `log_path`
    fn launch(&self, config: &NodeConfig, log_path: &Path)
        -> Result<LaunchedProcess, SupervisorError>;

    /// Send a graceful termination request to a recorded process
    fn terminate(&self, record: &ProcessRecord) -> Result<TerminateOutcome, SupervisorError>;
}

// ============================================================================
// SBIO: I/O implementation (real OS processes)
// ============================================================================

/// Launches the broker start script and signals processes through `sysinfo`
pub struct OsProcessLauncher {
    start_script: PathBuf,
}

impl OsProcessLauncher {
    pub fn new(start_script: impl Into<PathBuf>) -> Self {
        Self {
            start_script: start_script.into(),
        }
    }
}

impl ProcessLauncher for OsProcessLauncher {
    fn launch(
        &self,
        config: &NodeConfig,
        log_path: &Path,
    ) -> Result<LaunchedProcess, SupervisorError> {
        let log = OpenOptions::new().create(true).append(true).open(log_path)?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(&self.start_script);
        cmd.args(server_start_args(&config.config_path))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));
        // Keep nodes alive when the orchestrator's terminal sends SIGINT
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| SupervisorError::Spawn {
            node_id: config.node_id,
            reason: e.to_string(),
        })?;
        let pid = child.id().ok_or_else(|| SupervisorError::Spawn {
            node_id: config.node_id,
            reason: "process exited before its pid could be read".to_string(),
        })?;

        Ok(LaunchedProcess {
            pid,
            started_at: process_start_time(pid),
        })
    }

    fn terminate(&self, record: &ProcessRecord) -> Result<TerminateOutcome, SupervisorError> {
        let pid = Pid::from_u32(record.pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = match system.process(pid) {
            Some(p) if p.status() != ProcessStatus::Zombie => p,
            _ => return Ok(TerminateOutcome::NotFound),
        };

        if let Some(recorded) = record.started_at {
            let current = process.start_time();
            if current != recorded {
                return Ok(TerminateOutcome::PidReused { recorded, current });
            }
        }

        match process.kill_with(Signal::Term) {
            Some(true) => Ok(TerminateOutcome::Signalled),
            Some(false) => Err(SupervisorError::Signal {
                pid: record.pid,
                reason: "signal was not delivered".to_string(),
            }),
            None => Err(SupervisorError::Signal {
                pid: record.pid,
                reason: "SIGTERM is not supported on this platform".to_string(),
            }),
        }
    }
}

/// Start time of `pid` in seconds since the epoch, if it is visible
pub fn process_start_time(pid: u32) -> Option<u64> {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| p.start_time())
}

// ============================================================================
// Supervisor
// ============================================================================

/// Result of the spawn phase
#[derive(Debug, Clone, Default)]
pub struct SpawnReport {
    pub registry: ProcessRegistry,
    /// Nodes whose launch failed, with the reason
    pub failures: Vec<(u16, String)>,
}

/// Per-node result of `stop_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStop {
    Terminated,
    AlreadyGone,
    SkippedReusedPid,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReport {
    /// No registry was present
    NothingToStop,
    Stopped(BTreeMap<u16, NodeStop>),
}

impl StopReport {
    /// True when every recorded node is known to be down or was signalled
    pub fn is_clean(&self) -> bool {
        match self {
            StopReport::NothingToStop => true,
            StopReport::Stopped(results) => results
                .values()
                .all(|r| matches!(r, NodeStop::Terminated | NodeStop::AlreadyGone)),
        }
    }
}

pub struct ProcessSupervisor {
    workspace: Workspace,
    launcher: Arc<dyn ProcessLauncher>,
    stagger: Duration,
}

impl ProcessSupervisor {
    pub fn new(workspace: Workspace, launcher: Arc<dyn ProcessLauncher>, stagger: Duration) -> Self {
        Self {
            workspace,
            launcher,
            stagger,
        }
    }

    /// Launch every node in ascending id order and persist the registry
    ///
    /// A failed launch is recorded and the next node is still attempted. The
    /// registry is written once, after every launch has been attempted. If
    /// it cannot be written, the launched nodes are terminated again so no
    /// untracked process is left behind.
    pub async fn spawn_all(&self, configs: &[NodeConfig]) -> Result<SpawnReport, SupervisorError> {
        std::fs::create_dir_all(self.workspace.logs_dir())?;

        let mut ordered: Vec<&NodeConfig> = configs.iter().collect();
        ordered.sort_by_key(|c| c.node_id);

        let mut report = SpawnReport::default();
        for (i, config) in ordered.iter().enumerate() {
            if i > 0 && !self.stagger.is_zero() {
                sleep(self.stagger).await;
            }

            let log_path = self.workspace.node_log_path(config.node_id);
            info!("Starting node {} -> log: {}", config.node_id, log_path.display());

            match self.launcher.launch(config, &log_path) {
                Ok(launched) => {
                    debug!("Node {} running as pid {}", config.node_id, launched.pid);
                    report.registry.insert(ProcessRecord {
                        node_id: config.node_id,
                        pid: launched.pid,
                        config_path: config.config_path.clone(),
                        log_path,
                        started_at: launched.started_at,
                    });
                }
                Err(e) => {
                    warn!("Failed to start node {}: {}", config.node_id, e);
                    report.failures.push((config.node_id, e.to_string()));
                }
            }
        }

        let registry_file = self.workspace.registry_file();
        if let Err(e) = report.registry.save(&registry_file) {
            warn!("Could not record process info: {}; terminating launched nodes", e);
            for record in report.registry.records() {
                if let Err(stop_err) = self.launcher.terminate(record) {
                    warn!("Failed to stop node {}: {}", record.node_id, stop_err);
                }
            }
            return Err(e.into());
        }
        info!("Started nodes, process info recorded to {}", registry_file.display());
        Ok(report)
    }

    /// Terminate every process in the persisted registry, then delete it
    pub async fn stop_all(&self) -> Result<StopReport, SupervisorError> {
        let registry_file = self.workspace.registry_file();
        let Some(registry) = ProcessRegistry::load(&registry_file)? else {
            info!(
                "No {} found; nothing to stop (or nodes were started manually)",
                registry_file.display()
            );
            return Ok(StopReport::NothingToStop);
        };

        let mut results = BTreeMap::new();
        for record in registry.records() {
            info!("Stopping node {} pid {}", record.node_id, record.pid);
            let result = match self.launcher.terminate(record) {
                Ok(TerminateOutcome::Signalled) => NodeStop::Terminated,
                Ok(TerminateOutcome::NotFound) => {
                    info!("Process {} not found", record.pid);
                    NodeStop::AlreadyGone
                }
                Ok(TerminateOutcome::PidReused { recorded, current }) => {
                    warn!(
                        "Pid {} was reused (recorded start {}, current start {}); not signalling",
                        record.pid, recorded, current
                    );
                    NodeStop::SkippedReusedPid
                }
                Err(e) => {
                    warn!("Failed to stop node {}: {}", record.node_id, e);
                    NodeStop::Failed(e.to_string())
                }
            };
            results.insert(record.node_id, result);
        }

        ProcessRegistry::remove(&registry_file)?;
        Ok(StopReport::Stopped(results))
    }

    /// The persisted registry, if any
    pub fn registry(&self) -> Result<Option<ProcessRegistry>, SupervisorError> {
        Ok(ProcessRegistry::load(&self.workspace.registry_file())?)
    }
}

// ============================================================================
// SBIO: Simulated launcher for testing (no processes)
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Hands out fake pids and records every launch/terminate call
    pub struct SimulatedLauncher {
        next_pid: AtomicU32,
        fail_nodes: HashSet<u16>,
        gone_pids: HashSet<u32>,
        pub launched: Mutex<Vec<u16>>,
        pub terminated: Mutex<Vec<u32>>,
    }

    impl SimulatedLauncher {
        pub fn new() -> Self {
            Self {
                next_pid: AtomicU32::new(1000),
                fail_nodes: HashSet::new(),
                gone_pids: HashSet::new(),
                launched: Mutex::new(Vec::new()),
                terminated: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(mut self, node_id: u16) -> Self {
            self.fail_nodes.insert(node_id);
            self
        }

        pub fn already_gone(mut self, pid: u32) -> Self {
            self.gone_pids.insert(pid);
            self
        }
    }

    impl ProcessLauncher for SimulatedLauncher {
        fn launch(
            &self,
            config: &NodeConfig,
            _log_path: &Path,
        ) -> Result<LaunchedProcess, SupervisorError> {
            self.launched.lock().unwrap().push(config.node_id);
            if self.fail_nodes.contains(&config.node_id) {
                return Err(SupervisorError::Spawn {
                    node_id: config.node_id,
                    reason: "simulated failure".to_string(),
                });
            }
            Ok(LaunchedProcess {
                pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
                started_at: Some(42),
            })
        }

        fn terminate(&self, record: &ProcessRecord) -> Result<TerminateOutcome, SupervisorError> {
            self.terminated.lock().unwrap().push(record.pid);
            if self.gone_pids.contains(&record.pid) {
                Ok(TerminateOutcome::NotFound)
            } else {
                Ok(TerminateOutcome::Signalled)
            }
        }
    }
}
