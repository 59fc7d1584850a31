//! Cluster orchestrator
//!
//! Composes config generation, storage formatting, process supervision,
//! quorum probing and the benchmark harness into the lifecycle operations
//! `init`, `start`, `stop`, `status`, `clean` and the experiment stages.
//!
//! One orchestrator process is assumed per workspace. There is no lock; two
//! processes running `start`/`stop` against the same workspace race on the
//! registry file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::admin::TopicAdmin;
use crate::bench::{BenchmarkResult, PerformanceHarness, Stage};
use crate::client::{KafkaClient, RecordSink, WatermarkSource};
use crate::config::{ClusterSettings, ConfigError, ConfigGenerator, NodeConfig, Topology, Workspace};
use crate::runtime::kafka::SERVER_START_SCRIPT;
use crate::runtime::{
    ClusterIdentity, CommandRunner, FormatReport, IdentityError, KafkaTools, OsProcessLauncher,
    ProcessLauncher, ProcessRegistry, ProcessRunner, ProcessSupervisor, StopReport,
    StorageFormatter, SupervisorError,
};

use super::cleanup::{remove_tree, CleanReport};
use super::lifecycle::{transition, ClusterState, LifecycleError, LifecycleEvent, LifecycleStore};
use super::quorum::{QuorumProbe, QuorumStatus};

/// Upper bound for any single admin script run
const TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors that abort a lifecycle operation
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Failed to create workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cluster identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// What `init` produced
#[derive(Debug, Clone)]
pub struct InitReport {
    pub cluster_id: String,
    pub configs: Vec<NodeConfig>,
    /// Per-node format failures do not fail `init`
    pub format: FormatReport,
}

#[derive(Debug, Clone)]
pub enum StartOutcome {
    Running {
        controller: String,
        leader_id: i64,
        spawn_failures: Vec<(u16, String)>,
    },
    /// Quorum was not reached and every spawned node was stopped again
    RolledBack {
        last_error: Option<String>,
        spawn_failures: Vec<(u16, String)>,
        stop: StopReport,
    },
}

impl StartOutcome {
    pub fn is_running(&self) -> bool {
        matches!(self, StartOutcome::Running { .. })
    }
}

/// Snapshot for the `status` command
#[derive(Debug, Clone)]
pub struct ClusterStatus {
    pub workspace: PathBuf,
    pub kafka_dir: PathBuf,
    pub topology: Topology,
    pub state: ClusterState,
    pub cluster_id: Option<String>,
    pub registry: Option<ProcessRegistry>,
}

#[derive(Debug)]
pub struct CleanOutcome {
    pub stop: StopReport,
    pub clean: CleanReport,
}

/// Everything one self-contained stage did
#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub init: InitReport,
    pub start: StartOutcome,
    /// Empty when the cluster never reached quorum
    pub results: Vec<BenchmarkResult>,
    pub stop: StopReport,
    pub clean: CleanReport,
}

pub struct ClusterOrchestrator {
    settings: ClusterSettings,
    workspace: Workspace,
    tools: KafkaTools,
    generator: ConfigGenerator,
    identity: ClusterIdentity,
    formatter: StorageFormatter,
    supervisor: ProcessSupervisor,
    probe: QuorumProbe,
    lifecycle: LifecycleStore,
    sink: Arc<dyn RecordSink>,
    watermarks: Arc<dyn WatermarkSource>,
    workers: usize,
}

impl ClusterOrchestrator {
    /// Orchestrator backed by real processes and a real Kafka client
    pub fn new(settings: ClusterSettings) -> Self {
        let client = Arc::new(KafkaClient::new(settings.topology.bootstrap_servers()));
        let launcher = Arc::new(OsProcessLauncher::new(
            settings.kafka_bin(SERVER_START_SCRIPT),
        ));
        Self::with_seams(
            settings,
            Arc::new(ProcessRunner::with_timeout(TOOL_TIMEOUT)),
            launcher,
            client.clone(),
            client,
        )
    }

    /// Orchestrator with every external collaborator supplied by the caller
    pub fn with_seams(
        settings: ClusterSettings,
        runner: Arc<dyn CommandRunner>,
        launcher: Arc<dyn ProcessLauncher>,
        sink: Arc<dyn RecordSink>,
        watermarks: Arc<dyn WatermarkSource>,
    ) -> Self {
        let workspace = settings.workspace();
        let tools = KafkaTools::new(&settings.kafka_dir, runner);
        Self {
            generator: ConfigGenerator::new(workspace.clone()),
            identity: ClusterIdentity::new(workspace.cluster_id_file(), tools.clone()),
            formatter: StorageFormatter::new(tools.clone()),
            supervisor: ProcessSupervisor::new(
                workspace.clone(),
                launcher,
                settings.spawn_stagger,
            ),
            probe: QuorumProbe::new(tools.clone(), settings.quorum_poll_interval),
            lifecycle: LifecycleStore::new(workspace.clone()),
            tools,
            workspace,
            settings,
            sink,
            watermarks,
            workers: 1,
        }
    }

    /// Number of concurrent producer workers used by the stages
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn state(&self) -> ClusterState {
        self.lifecycle.current()
    }

    /// Write node configs, load or create the cluster id, format storage
    ///
    /// Re-running regenerates configs and re-attempts formatting.
    pub async fn init(&self) -> Result<InitReport, OrchestratorError> {
        transition(self.state(), LifecycleEvent::ConfigsWritten)?;

        self.workspace
            .ensure_dirs()
            .map_err(|source| OrchestratorError::Workspace {
                path: self.workspace.root().to_path_buf(),
                source,
            })?;
        let configs = self.generator.generate(&self.settings.topology)?;
        self.lifecycle.apply(LifecycleEvent::ConfigsWritten)?;

        let cluster_id = self.identity.load_or_create().await?;
        info!("Using cluster id {}", cluster_id);

        let format = self.formatter.format_all(&configs, &cluster_id).await;
        if !format.is_complete() {
            warn!(
                "{} node(s) failed to format; start is still allowed",
                format.warnings.len()
            );
        }
        self.lifecycle.apply(LifecycleEvent::StorageFormatted)?;

        Ok(InitReport {
            cluster_id,
            configs,
            format,
        })
    }

    /// Spawn every node and wait for a leader, rolling back on timeout
    pub async fn start(&self) -> Result<StartOutcome, OrchestratorError> {
        self.lifecycle.apply(LifecycleEvent::SpawnStarted)?;

        let configs = self.generator.existing(&self.settings.topology);
        let spawn = self.supervisor.spawn_all(&configs).await?;

        info!("Waiting for KRaft quorum (timeout {:?})", self.settings.quorum_timeout);
        let controllers = self.settings.topology.controller_endpoints();
        match self
            .probe
            .wait_for_quorum(&controllers, self.settings.quorum_timeout)
            .await
        {
            QuorumStatus::Reached {
                controller,
                leader_id,
            } => {
                self.lifecycle.apply(LifecycleEvent::QuorumReached)?;
                info!("Cluster started successfully");
                Ok(StartOutcome::Running {
                    controller,
                    leader_id,
                    spawn_failures: spawn.failures,
                })
            }
            QuorumStatus::TimedOut { last_error } => {
                warn!("Cluster failed to reach quorum; stopping processes");
                self.lifecycle.apply(LifecycleEvent::QuorumFailed)?;
                let stop = self.supervisor.stop_all().await?;
                self.lifecycle.apply(LifecycleEvent::StopCompleted)?;
                Ok(StartOutcome::RolledBack {
                    last_error,
                    spawn_failures: spawn.failures,
                    stop,
                })
            }
        }
    }

    /// Terminate every tracked node; a no-op when nothing is tracked
    pub async fn stop(&self) -> Result<StopReport, OrchestratorError> {
        let state = self.state();
        let tracked = matches!(
            state,
            ClusterState::Starting | ClusterState::Running | ClusterState::Stopping
        );
        if tracked {
            self.lifecycle.apply(LifecycleEvent::StopRequested)?;
        }

        let report = self.supervisor.stop_all().await?;

        if tracked {
            self.lifecycle.apply(LifecycleEvent::StopCompleted)?;
        }
        Ok(report)
    }

    pub fn status(&self) -> Result<ClusterStatus, OrchestratorError> {
        Ok(ClusterStatus {
            workspace: self.workspace.root().to_path_buf(),
            kafka_dir: self.settings.kafka_dir.clone(),
            topology: self.settings.topology,
            state: self.state(),
            cluster_id: self.identity.load()?,
            registry: self.supervisor.registry()?,
        })
    }

    /// Stop the cluster, then delete the whole workspace best-effort
    pub async fn clean(&self) -> Result<CleanOutcome, OrchestratorError> {
        let stop = self.stop().await?;
        self.lifecycle.apply(LifecycleEvent::Cleaned)?;

        info!("Removing {}", self.workspace.root().display());
        let clean = remove_tree(self.workspace.root());
        if !clean.is_complete() {
            warn!("{} path(s) could not be removed", clean.errors.len());
        }
        Ok(CleanOutcome { stop, clean })
    }

    fn harness(&self) -> PerformanceHarness {
        let admin = TopicAdmin::new(
            self.tools.clone(),
            self.settings.topology,
            self.workspace.clone(),
            self.watermarks.clone(),
        );
        PerformanceHarness::new(
            self.tools.clone(),
            Arc::new(admin),
            self.sink.clone(),
            self.settings.topology,
        )
        .with_workers(self.workers)
    }

    /// Run one stage in its own init, start, run, stop, clean cycle
    ///
    /// The workspace is cleaned even when `init` or `start` fails; the
    /// original error is returned afterwards.
    pub async fn run_stage(&self, stage: Stage) -> Result<StageReport, OrchestratorError> {
        // a cluster that is already up belongs to someone else; leave it alone
        transition(self.state(), LifecycleEvent::ConfigsWritten)?;

        let started = match self.init().await {
            Ok(init) => self.start().await.map(|start| (init, start)),
            Err(e) => Err(e),
        };
        let (init, start) = match started {
            Ok(pair) => pair,
            Err(e) => {
                warn!("{} aborted: {}; cleaning up", stage, e);
                if let Err(clean_err) = self.clean().await {
                    warn!("Cleanup after failed {} also failed: {}", stage, clean_err);
                }
                return Err(e);
            }
        };

        let results = if start.is_running() {
            stage.run(&self.harness()).await
        } else {
            warn!("Skipping {} because the cluster did not start", stage);
            Vec::new()
        };

        let CleanOutcome { stop, clean } = self.clean().await?;
        Ok(StageReport {
            stage,
            init,
            start,
            results,
            stop,
            clean,
        })
    }
}
