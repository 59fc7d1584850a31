pub mod command;
pub mod identity;
pub mod kafka;
pub mod registry;
pub mod storage;
pub mod supervisor;

pub use command::{CommandOutput, CommandRunner, ProcessRunner, ToolError};
pub use identity::{ClusterIdentity, IdentityError};
pub use kafka::{KafkaTools, PerfTestParams};
pub use registry::{ProcessRecord, ProcessRegistry, RegistryError};
pub use storage::{FormatReport, FormatWarning, StorageFormatter};
pub use supervisor::{
    LaunchedProcess, NodeStop, OsProcessLauncher, ProcessLauncher, ProcessSupervisor,
    SpawnReport, StopReport, SupervisorError, TerminateOutcome,
};
