//! Producer performance harness
//!
//! Every grid cell is an independent call returning a [`BenchmarkResult`].
//! A failing cell is recorded in its result and the sweep moves on to the
//! next one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{info, warn};

use crate::admin::{AdminOutcome, TopicAdmin, TopicSpec};
use crate::client::{ProduceReport, RecordSink};
use crate::config::Topology;
use crate::runtime::kafka::{KafkaTools, PerfTestParams};

use super::workload::produce_parallel;

/// One producer perf-test configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRun {
    pub topic: String,
    pub batch_size: u64,
    pub linger_ms: u64,
    pub compression: String,
    pub record_size: u64,
    pub num_records: u64,
}

impl BenchmarkRun {
    pub fn label(&self) -> String {
        format!(
            "batch_size={} linger_ms={} compression={}",
            self.batch_size, self.linger_ms, self.compression
        )
    }

    pub fn params(&self) -> PerfTestParams {
        PerfTestParams {
            topic: self.topic.clone(),
            num_records: self.num_records,
            record_size: self.record_size,
            throughput: -1,
            batch_size: self.batch_size,
            linger_ms: self.linger_ms,
            compression: self.compression.clone(),
        }
    }
}

/// Final summary line printed by the producer perf tool
#[derive(Debug, Clone, PartialEq)]
pub struct PerfSummary {
    pub records_sent: u64,
    pub records_per_sec: f64,
    pub mb_per_sec: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

/// Parse the last `N records sent, ...` line of perf-tool output
pub fn parse_perf_summary(output: &str) -> Option<PerfSummary> {
    let pattern = Regex::new(
        r"(\d+) records sent, ([\d.]+) records/sec \(([\d.]+) MB/sec\), ([\d.]+) ms avg latency, ([\d.]+) ms max latency",
    )
    .ok()?;
    let caps = pattern.captures_iter(output).last()?;
    Some(PerfSummary {
        records_sent: caps[1].parse().ok()?,
        records_per_sec: caps[2].parse().ok()?,
        mb_per_sec: caps[3].parse().ok()?,
        avg_latency_ms: caps[4].parse().ok()?,
        max_latency_ms: caps[5].parse().ok()?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { code: Option<i32>, message: String },
}

/// Measurements for one grid cell
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub label: String,
    pub topic: String,
    pub outcome: RunOutcome,
    /// Captured tool output (perf tool or topic description)
    pub output: String,
    pub summary: Option<PerfSummary>,
    pub elapsed: Duration,
    /// On-disk size of partition 0
    pub partition_bytes: Option<u64>,
    /// Message count per partition; `None` where the watermark query failed
    pub partition_counts: Option<Vec<Option<i64>>>,
    pub produced: Option<ProduceReport>,
    /// Non-fatal admin failures seen while preparing the cell
    pub diagnostics: Vec<String>,
}

impl BenchmarkResult {
    pub fn new(label: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            topic: topic.into(),
            outcome: RunOutcome::Completed,
            output: String::new(),
            summary: None,
            elapsed: Duration::ZERO,
            partition_bytes: None,
            partition_counts: None,
            produced: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    fn record_admin(&mut self, action: &str, outcome: AdminOutcome) {
        match outcome {
            AdminOutcome::Ok { output } => {
                if !output.trim().is_empty() {
                    self.output.push_str(&output);
                }
            }
            AdminOutcome::Failed { code, message } => {
                self.diagnostics
                    .push(format!("{} rc={:?} err={}", action, code, message));
            }
        }
    }
}

pub struct PerformanceHarness {
    tools: KafkaTools,
    admin: Arc<TopicAdmin>,
    sink: Arc<dyn RecordSink>,
    topology: Topology,
    workers: usize,
}

impl PerformanceHarness {
    pub fn new(
        tools: KafkaTools,
        admin: Arc<TopicAdmin>,
        sink: Arc<dyn RecordSink>,
        topology: Topology,
    ) -> Self {
        Self {
            tools,
            admin,
            sink,
            topology,
            workers: 1,
        }
    }

    /// Number of concurrent producer workers for generated records
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Create (and optionally describe) a topic as the setup step of a stage
    pub async fn prepare_topic(&self, spec: &TopicSpec, describe: bool) -> BenchmarkResult {
        let started = Instant::now();
        let mut result = BenchmarkResult::new(format!("setup {}", spec.name), &spec.name);
        self.create_and_describe(spec, describe, &mut result).await;
        if !result.diagnostics.is_empty() {
            result.outcome = RunOutcome::Failed {
                code: None,
                message: result.diagnostics.join("; "),
            };
        }
        result.elapsed = started.elapsed();
        result
    }

    async fn create_and_describe(&self, spec: &TopicSpec, describe: bool, result: &mut BenchmarkResult) {
        let created = self.admin.create_topic(spec).await;
        result.record_admin(&format!("Create topic '{}'", spec.name), created);
        if describe {
            let described = self.admin.describe_topic(&spec.name).await;
            result.record_admin(&format!("Describe topic '{}'", spec.name), described);
        }
    }

    /// Run the producer perf tool once with the cluster's broker list
    pub async fn perf_test(&self, run: &BenchmarkRun) -> BenchmarkResult {
        info!("=== Testing {} ===", run.label());
        let mut result = BenchmarkResult::new(run.label(), &run.topic);
        let started = Instant::now();

        match self
            .tools
            .producer_perf_test(&run.params(), &self.topology.bootstrap_servers())
            .await
        {
            Ok(output) if output.success() => {
                result.summary = parse_perf_summary(&output.stdout);
                result.output = output.stdout;
            }
            Ok(output) => {
                warn!(
                    "Test producer performance '{}' rc={:?} err={}",
                    run.topic,
                    output.code,
                    output.stderr.trim()
                );
                result.output = output.stdout;
                result.outcome = RunOutcome::Failed {
                    code: output.code,
                    message: output.stderr.trim().to_string(),
                };
            }
            Err(e) => {
                warn!("Test producer performance '{}' failed: {}", run.topic, e);
                result.outcome = RunOutcome::Failed {
                    code: None,
                    message: e.to_string(),
                };
            }
        }

        result.elapsed = started.elapsed();
        result
    }

    /// Run every configuration in order; failures never stop the sweep
    pub async fn sweep(&self, runs: &[BenchmarkRun]) -> Vec<BenchmarkResult> {
        let mut results = Vec::with_capacity(runs.len());
        for run in runs {
            results.push(self.perf_test(run).await);
        }
        results
    }

    /// Perf-test a dedicated single-partition topic and measure its size
    pub async fn compression_run(&self, run: &BenchmarkRun) -> BenchmarkResult {
        let spec = TopicSpec::new(&run.topic, 1, 1);
        let mut setup = BenchmarkResult::new(run.label(), &run.topic);
        self.create_and_describe(&spec, false, &mut setup).await;

        let mut result = self.perf_test(run).await;
        result.diagnostics.extend(setup.diagnostics);
        let bytes = self.admin.partition_byte_size(&run.topic, 0);
        info!("Topic '{}' size: {:.2} KB", run.topic, bytes as f64 / 1024.0);
        result.partition_bytes = Some(bytes);
        result
    }

    /// Create a topic, produce generated records to it and optionally count
    /// the messages that landed in each partition
    pub async fn produce_run(
        &self,
        spec: &TopicSpec,
        num_records: u64,
        flush_every: usize,
        count_partitions: bool,
    ) -> BenchmarkResult {
        let started = Instant::now();
        let mut result = BenchmarkResult::new(
            format!("partitions={} records={}", spec.partitions, num_records),
            &spec.name,
        );
        self.create_and_describe(spec, true, &mut result).await;

        let produced = produce_parallel(
            self.sink.clone(),
            &spec.name,
            num_records,
            self.workers,
            flush_every,
        )
        .await;
        if produced.failed > 0 {
            result.outcome = RunOutcome::Failed {
                code: None,
                message: format!("{} of {} messages failed", produced.failed, num_records),
            };
        } else {
            info!("All messages sent successfully.");
        }
        result.produced = Some(produced);

        if count_partitions {
            let mut counts = Vec::with_capacity(spec.partitions as usize);
            for partition in 0..spec.partitions {
                match self
                    .admin
                    .partition_message_count(&spec.name, partition as i32)
                    .await
                {
                    Ok(count) => counts.push(Some(count)),
                    Err(e) => {
                        warn!("{}", e);
                        result.diagnostics.push(e.to_string());
                        counts.push(None);
                    }
                }
            }
            info!("Topic '{}' partition message counts: {:?}", spec.name, counts);
            result.partition_counts = Some(counts);
        }

        result.elapsed = started.elapsed();
        result
    }
}
