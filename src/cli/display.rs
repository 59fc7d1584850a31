//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format reports for display

use serde_json::json;

use crate::bench::{BenchmarkResult, RunOutcome};
use crate::cluster::{
    CleanOutcome, CleanReport, ClusterStatus, InitReport, StageReport, StartOutcome,
};
use crate::config::Topology;
use crate::runtime::{NodeStop, StopReport};

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No entries.\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();
    let mut push_row = |cells: Vec<String>| {
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(w) => format!("{:width$}", cell, width = *w),
                None => cell.clone(),
            })
            .collect();
        output.push_str(line.join("   ").trim_end());
        output.push('\n');
    };

    push_row(headers.iter().map(|h| h.to_uppercase()).collect());
    for row in rows {
        push_row(row);
    }
    output
}

/// Broker and controller endpoints as pretty JSON
pub fn format_endpoints(topology: &Topology) -> String {
    let endpoints = json!({
        "brokers": topology.broker_endpoints(),
        "controllers": topology.controller_endpoints(),
    });
    serde_json::to_string_pretty(&endpoints).unwrap_or_default()
}

// ============================================================================
// Lifecycle display
// ============================================================================

pub fn format_init(report: &InitReport, topology: &Topology) -> String {
    let mut output = format!("Cluster id: {}\n", report.cluster_id);
    output.push_str(&format!("Endpoints: {}\n", format_endpoints(topology)));
    for warning in &report.format.warnings {
        output.push_str(&format!(
            "WARNING: formatting node {} returned rc={:?}: {}\n",
            warning.node_id, warning.code, warning.message
        ));
    }
    output
}

pub fn format_start(outcome: &StartOutcome) -> String {
    let mut output = String::new();
    match outcome {
        StartOutcome::Running {
            controller,
            leader_id,
            spawn_failures,
        } => {
            for (node, reason) in spawn_failures {
                output.push_str(&format!("Node {} failed to start: {}\n", node, reason));
            }
            output.push_str(&format!(
                "Quorum OK via controller {} (leader {})\nCluster started successfully\n",
                controller, leader_id
            ));
        }
        StartOutcome::RolledBack {
            last_error,
            spawn_failures,
            stop,
        } => {
            for (node, reason) in spawn_failures {
                output.push_str(&format!("Node {} failed to start: {}\n", node, reason));
            }
            output.push_str(&format!(
                "Cluster failed to reach quorum (last error: {}); processes stopped\n",
                last_error.as_deref().unwrap_or("none")
            ));
            output.push_str(&format_stop(stop));
        }
    }
    output
}

pub fn format_stop(report: &StopReport) -> String {
    match report {
        StopReport::NothingToStop => {
            "No process info found; nothing to stop (or nodes were started manually)\n".to_string()
        }
        StopReport::Stopped(nodes) => {
            let rows = nodes
                .iter()
                .map(|(node, result)| {
                    let result = match result {
                        NodeStop::Terminated => "terminated".to_string(),
                        NodeStop::AlreadyGone => "not found".to_string(),
                        NodeStop::SkippedReusedPid => "skipped (pid reused)".to_string(),
                        NodeStop::Failed(reason) => format!("failed: {}", reason),
                    };
                    vec![node.to_string(), result]
                })
                .collect();
            format_table(&["node", "result"], rows)
        }
    }
}

pub fn format_status(status: &ClusterStatus) -> String {
    let mut output = String::new();
    output.push_str(&format!("Workdir: {}\n", status.workspace.display()));
    output.push_str(&format!("Kafka dir: {}\n", status.kafka_dir.display()));
    output.push_str(&format!("Nodes: {}\n", status.topology.node_count()));
    output.push_str(&format!("State: {}\n", status.state));
    if let Some(id) = &status.cluster_id {
        output.push_str(&format!("Cluster id: {}\n", id));
    }
    output.push_str(&format!("Endpoints: {}\n", format_endpoints(&status.topology)));

    match &status.registry {
        Some(registry) => {
            let rows = registry
                .records()
                .map(|r| {
                    vec![
                        r.node_id.to_string(),
                        r.pid.to_string(),
                        r.config_path.display().to_string(),
                        r.log_path.display().to_string(),
                    ]
                })
                .collect();
            output.push_str("Process info:\n");
            output.push_str(&format_table(&["node", "pid", "conf", "log"], rows));
        }
        None => {
            output.push_str("No process info (not started with this tool or already stopped).\n")
        }
    }
    output
}

pub fn format_clean(outcome: &CleanOutcome) -> String {
    let mut output = format_stop(&outcome.stop);
    output.push_str(&format_removal(&outcome.clean));
    output
}

fn format_removal(clean: &CleanReport) -> String {
    let mut output = format!("Removed {} path(s)\n", clean.removed);
    for (path, e) in &clean.errors {
        output.push_str(&format!("Could not remove {}: {}\n", path.display(), e));
    }
    output
}

// ============================================================================
// Benchmark display
// ============================================================================

pub fn format_result(result: &BenchmarkResult) -> String {
    let mut output = format!("\n=== {} ({}) ===\n", result.label, result.topic);
    if !result.output.trim().is_empty() {
        output.push_str(result.output.trim_end());
        output.push('\n');
    }
    for diagnostic in &result.diagnostics {
        output.push_str(&format!("{}\n", diagnostic));
    }
    if let Some(summary) = &result.summary {
        output.push_str(&format!(
            "Summary: {} records, {:.1} records/sec, {:.2} MB/sec, {:.2} ms avg latency, {:.2} ms max latency\n",
            summary.records_sent,
            summary.records_per_sec,
            summary.mb_per_sec,
            summary.avg_latency_ms,
            summary.max_latency_ms
        ));
    }
    if let Some(produced) = &result.produced {
        output.push_str(&format!(
            "Produced: {} delivered, {} failed\n",
            produced.delivered, produced.failed
        ));
    }
    if let Some(bytes) = result.partition_bytes {
        output.push_str(&format!(
            "Topic '{}' size: {:.2} KB\n",
            result.topic,
            bytes as f64 / 1024.0
        ));
    }
    if let Some(counts) = &result.partition_counts {
        let counts: Vec<String> = counts
            .iter()
            .map(|c| c.map_or_else(|| "?".to_string(), |n| n.to_string()))
            .collect();
        output.push_str(&format!(
            "Topic '{}' partition message counts: [{}]\n",
            result.topic,
            counts.join(", ")
        ));
    }
    if let RunOutcome::Failed { code, message } = &result.outcome {
        output.push_str(&format!("FAILED rc={:?} err={}\n", code, message));
    }
    output.push_str(&format!("Elapsed: {:.2?}\n", result.elapsed));
    output
}

pub fn format_stage_report(report: &StageReport) -> String {
    let mut output = format!("Stage {}\n", report.stage);
    output.push_str(&format!("Cluster id: {}\n", report.init.cluster_id));
    output.push_str(&format_start(&report.start));
    for result in &report.results {
        output.push_str(&format_result(result));
    }
    let failed = report.results.iter().filter(|r| !r.is_ok()).count();
    output.push_str(&format!(
        "\n{} run(s), {} failed\n",
        report.results.len(),
        failed
    ));
    output.push_str(&format_stop(&report.stop));
    output.push_str(&format_removal(&report.clean));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_table_alignment() {
        let output = format_table(
            &["node", "result"],
            vec![
                vec!["1".to_string(), "terminated".to_string()],
                vec!["10".to_string(), "not found".to_string()],
            ],
        );
        assert_eq!(output, "NODE   RESULT\n1      terminated\n10     not found\n");
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(&["a"], vec![]), "No entries.\n");
    }

    #[test]
    fn test_format_endpoints() {
        let topology = Topology::new(2, 9092, 9029).unwrap();
        let value: serde_json::Value = serde_json::from_str(&format_endpoints(&topology)).unwrap();
        assert_eq!(value["brokers"][1], "localhost:9093");
        assert_eq!(value["controllers"][0], "localhost:9029");
    }

    #[test]
    fn test_format_stop() {
        assert!(format_stop(&StopReport::NothingToStop).contains("nothing to stop"));

        let mut nodes = BTreeMap::new();
        nodes.insert(1, NodeStop::Terminated);
        nodes.insert(2, NodeStop::SkippedReusedPid);
        let output = format_stop(&StopReport::Stopped(nodes));
        assert!(output.contains("skipped (pid reused)"));
    }

    #[test]
    fn test_format_result_partition_counts() {
        let mut result = BenchmarkResult::new("partitions=3 records=500", "nuclear-part-3");
        result.partition_counts = Some(vec![Some(170), None, Some(160)]);
        let output = format_result(&result);
        assert!(output.contains("Topic 'nuclear-part-3' partition message counts: [170, ?, 160]"));
    }

    #[test]
    fn test_format_result_size_and_failure() {
        let mut result = BenchmarkResult::new("compression=zstd", "nuclear-comp-zstd");
        result.partition_bytes = Some(3072);
        result.outcome = RunOutcome::Failed {
            code: Some(1),
            message: "boom".to_string(),
        };
        let output = format_result(&result);
        assert!(output.contains("Topic 'nuclear-comp-zstd' size: 3.00 KB"));
        assert!(output.contains("FAILED rc=Some(1) err=boom"));
    }
}
