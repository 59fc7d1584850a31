pub mod harness;
pub mod records;
pub mod stages;
pub mod workload;

pub use harness::{
    parse_perf_summary, BenchmarkResult, BenchmarkRun, PerfSummary, PerformanceHarness, RunOutcome,
};
pub use records::{generate_payloads, ReactorReading};
pub use stages::Stage;
pub use workload::{partition_range, produce_parallel};
