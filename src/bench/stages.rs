//! The four experiment stages as fixed declarative grids

use std::fmt;

use tracing::info;

use crate::admin::TopicSpec;

use super::harness::{BenchmarkResult, BenchmarkRun, PerformanceHarness};

pub const RECORDS_PER_RUN: u64 = 500;
pub const RECORD_SIZE: u64 = 256;
/// Progress interval for the main topic fill
pub const BASIC_FLUSH_EVERY: usize = 50;
/// Progress interval for the partition sweep
pub const PARTITION_FLUSH_EVERY: usize = 100;

pub const MAIN_TOPIC: &str = "nuclear-main";
pub const BATCH_TOPIC: &str = "nuclear-batch-test";

pub const BATCH_SIZES: [u64; 3] = [16_384, 65_536, 262_144];
pub const LINGER_MS: [u64; 3] = [0, 10, 50];
pub const COMPRESSIONS: [&str; 4] = ["none", "snappy", "lz4", "zstd"];
pub const PARTITION_COUNTS: [u32; 3] = [3, 6, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Create, describe and fill the main topic
    Basic,
    /// Batch size × linger sweep
    BatchLinger,
    /// Compression algorithm sweep with on-disk size
    Compression,
    /// Partition-count sweep with per-partition counts
    Partitions,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Basic => "stg1",
            Stage::BatchLinger => "stg2",
            Stage::Compression => "stg3",
            Stage::Partitions => "stg4",
        }
    }

    /// Run this stage's grid against a running cluster, in order
    pub async fn run(&self, harness: &PerformanceHarness) -> Vec<BenchmarkResult> {
        info!("Running {}", self.name());
        match self {
            Stage::Basic => {
                let spec = TopicSpec::new(MAIN_TOPIC, 3, 3);
                vec![
                    harness
                        .produce_run(&spec, RECORDS_PER_RUN, BASIC_FLUSH_EVERY, false)
                        .await,
                ]
            }
            Stage::BatchLinger => {
                let mut results = vec![
                    harness
                        .prepare_topic(&TopicSpec::new(BATCH_TOPIC, 3, 3), true)
                        .await,
                ];
                results.extend(harness.sweep(&batch_linger_grid()).await);
                results
            }
            Stage::Compression => {
                let mut results = Vec::with_capacity(COMPRESSIONS.len());
                for run in compression_grid() {
                    results.push(harness.compression_run(&run).await);
                }
                results
            }
            Stage::Partitions => {
                let mut results = Vec::with_capacity(PARTITION_COUNTS.len());
                for spec in partition_grid() {
                    results.push(
                        harness
                            .produce_run(&spec, RECORDS_PER_RUN, PARTITION_FLUSH_EVERY, true)
                            .await,
                    );
                }
                results
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn base_run(topic: String) -> BenchmarkRun {
    BenchmarkRun {
        topic,
        batch_size: BATCH_SIZES[0],
        linger_ms: 5,
        compression: "none".to_string(),
        record_size: RECORD_SIZE,
        num_records: RECORDS_PER_RUN,
    }
}

/// Batch sizes outermost, linger innermost
pub fn batch_linger_grid() -> Vec<BenchmarkRun> {
    BATCH_SIZES
        .iter()
        .flat_map(|&batch_size| {
            LINGER_MS.iter().map(move |&linger_ms| BenchmarkRun {
                batch_size,
                linger_ms,
                ..base_run(BATCH_TOPIC.to_string())
            })
        })
        .collect()
}

pub fn compression_grid() -> Vec<BenchmarkRun> {
    COMPRESSIONS
        .iter()
        .map(|algo| BenchmarkRun {
            compression: algo.to_string(),
            ..base_run(format!("nuclear-comp-{}", algo))
        })
        .collect()
}

pub fn partition_grid() -> Vec<TopicSpec> {
    PARTITION_COUNTS
        .iter()
        .map(|&n| TopicSpec::new(format!("nuclear-part-{}", n), n, 3))
        .collect()
}
