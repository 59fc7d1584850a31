//! Parallel record production
//!
//! The record index space is split into contiguous ranges, one per worker.
//! Workers run concurrently and only the aggregate delivery count is
//! reported; ordering across workers is not preserved.

use std::ops::Range;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::client::{ProduceReport, RecordSink};

use super::records::generate_payloads;

/// Split `0..total` into at most `workers` contiguous, non-empty ranges
/// whose sizes differ by at most one
pub fn partition_range(total: u64, workers: usize) -> Vec<Range<u64>> {
    let workers = (workers.max(1) as u64).min(total.max(1));
    let base = total / workers;
    let extra = total % workers;

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = 0;
    for i in 0..workers {
        let len = base + u64::from(i < extra);
        if len > 0 {
            ranges.push(start..start + len);
        }
        start += len;
    }
    ranges
}

/// Produce `total` generated records to `topic` using `workers` concurrent
/// workers
pub async fn produce_parallel(
    sink: Arc<dyn RecordSink>,
    topic: &str,
    total: u64,
    workers: usize,
    progress_every: usize,
) -> ProduceReport {
    let mut tasks = JoinSet::new();
    for range in partition_range(total, workers) {
        let sink = sink.clone();
        let topic = topic.to_string();
        tasks.spawn(async move {
            let count = range.end - range.start;
            let payloads = generate_payloads(count);
            debug!("Worker for records {:?} started", range);
            match sink.produce(&topic, payloads, progress_every).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Worker for records {:?} failed: {}", range, e);
                    ProduceReport {
                        delivered: 0,
                        failed: count,
                    }
                }
            }
        });
    }

    let mut total_report = ProduceReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => total_report = total_report.merge(report),
            Err(e) => warn!("Producer worker panicked: {}", e),
        }
    }
    total_report
}
