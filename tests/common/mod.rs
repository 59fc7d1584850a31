//! Test doubles for the external seams

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use kraftlab::client::{ClientError, ProduceReport, RecordSink, WatermarkSource};
use kraftlab::config::NodeConfig;
use kraftlab::runtime::{
    CommandOutput, CommandRunner, LaunchedProcess, ProcessLauncher, ProcessRecord,
    SupervisorError, TerminateOutcome, ToolError,
};
use kraftlab::{ClusterOrchestrator, ClusterSettings};

pub const PERF_SUMMARY: &str = "500 records sent, 912.4 records/sec (0.22 MB/sec), 14.10 ms avg latency, 290.00 ms max latency, 10 ms 50th, 55 ms 95th, 280 ms 99th, 290 ms 99.9th.\n";

/// Fake Kafka admin scripts
pub struct FakeKafkaTools {
    healthy: bool,
    /// Zero-based index of the perf-test call that exits non-zero
    failing_perf_call: Option<usize>,
    perf_calls: AtomicUsize,
    uuid_calls: AtomicUsize,
    pub invocations: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeKafkaTools {
    pub fn healthy() -> Self {
        Self::new(true)
    }

    pub fn without_leader() -> Self {
        Self::new(false)
    }

    fn new(healthy: bool) -> Self {
        Self {
            healthy,
            failing_perf_call: None,
            perf_calls: AtomicUsize::new(0),
            uuid_calls: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_perf_call(mut self, index: usize) -> Self {
        self.failing_perf_call = Some(index);
        self
    }

    pub fn perf_calls(&self) -> usize {
        self.perf_calls.load(Ordering::SeqCst)
    }

    pub fn uuid_calls(&self) -> usize {
        self.uuid_calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, script: &str) -> Vec<Vec<String>> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|(program, _)| program.ends_with(script))
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeKafkaTools {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutput, ToolError> {
        let program = program.display().to_string();
        self.invocations
            .lock()
            .unwrap()
            .push((program.clone(), args.to_vec()));

        let output = if program.ends_with("kafka-storage.sh") && args[0] == "random-uuid" {
            self.uuid_calls.fetch_add(1, Ordering::SeqCst);
            CommandOutput::ok("q1Sh-9_ISia_zwGINzRvyQ\n")
        } else if program.ends_with("kafka-metadata-quorum.sh") {
            if self.healthy {
                CommandOutput::ok("ClusterId: q1Sh-9_ISia_zwGINzRvyQ\nLeaderId: 2\nLeaderEpoch: 1\n")
            } else {
                CommandOutput::failed(1, "Error: TimeoutException")
            }
        } else if program.ends_with("kafka-producer-perf-test.sh") {
            let n = self.perf_calls.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.failing_perf_call {
                CommandOutput::failed(1, "org.apache.kafka.common.errors.TimeoutException")
            } else {
                CommandOutput::ok(PERF_SUMMARY)
            }
        } else {
            CommandOutput::ok("")
        };
        Ok(output)
    }
}

/// Launcher that never starts a real process
pub struct FakeLauncher {
    next_pid: AtomicU32,
    failing_node: Option<u16>,
    pub launched: Mutex<Vec<u16>>,
    pub terminated: Mutex<Vec<u32>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(40_000),
            failing_node: None,
            launched: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(node_id: u16) -> Self {
        Self {
            failing_node: Some(node_id),
            ..Self::new()
        }
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, config: &NodeConfig, _log_path: &Path) -> Result<LaunchedProcess, SupervisorError> {
        self.launched.lock().unwrap().push(config.node_id);
        if Some(config.node_id) == self.failing_node {
            return Err(SupervisorError::Spawn {
                node_id: config.node_id,
                reason: "address already in use".to_string(),
            });
        }
        Ok(LaunchedProcess {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            started_at: Some(1_700_000_000),
        })
    }

    fn terminate(&self, record: &ProcessRecord) -> Result<TerminateOutcome, SupervisorError> {
        self.terminated.lock().unwrap().push(record.pid);
        Ok(TerminateOutcome::Signalled)
    }
}

/// Producer that counts records instead of sending them
#[derive(Default)]
pub struct CountingSink {
    pub records: AtomicU64,
}

#[async_trait]
impl RecordSink for CountingSink {
    async fn produce(
        &self,
        _topic: &str,
        payloads: Vec<Vec<u8>>,
        _progress_every: usize,
    ) -> Result<ProduceReport, ClientError> {
        let n = payloads.len() as u64;
        self.records.fetch_add(n, Ordering::SeqCst);
        Ok(ProduceReport {
            delivered: n,
            failed: 0,
        })
    }
}

/// Watermarks that split `total` messages evenly over `partitions`
pub struct EvenWatermarks {
    pub per_partition: i64,
}

#[async_trait]
impl WatermarkSource for EvenWatermarks {
    async fn watermarks(&self, _topic: &str, _partition: i32) -> Result<(i64, i64), ClientError> {
        Ok((0, self.per_partition))
    }
}

pub struct Harness {
    pub tools: Arc<FakeKafkaTools>,
    pub launcher: Arc<FakeLauncher>,
    pub sink: Arc<CountingSink>,
    pub orchestrator: ClusterOrchestrator,
}

pub fn orchestrator(workdir: &Path, tools: FakeKafkaTools, launcher: FakeLauncher) -> Harness {
    let settings = ClusterSettings::new("/opt/kafka", workdir, "itest")
        .unwrap()
        .with_quorum_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_secs(1))
        .with_spawn_stagger(Duration::from_millis(500));
    let tools = Arc::new(tools);
    let launcher = Arc::new(launcher);
    let sink = Arc::new(CountingSink::default());
    let orchestrator = ClusterOrchestrator::with_seams(
        settings,
        tools.clone(),
        launcher.clone(),
        sink.clone(),
        Arc::new(EvenWatermarks { per_partition: 100 }),
    );
    Harness {
        tools,
        launcher,
        sink,
        orchestrator,
    }
}
