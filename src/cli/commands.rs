//! Command implementations for the CLI
//!
//! SBIO pattern: commands return formatted reports, printing is left to the
//! caller

use thiserror::Error;

use crate::bench::Stage;
use crate::cluster::{ClusterOrchestrator, OrchestratorError};
use crate::config::SettingsError;

use super::display::{
    format_clean, format_init, format_stage_report, format_start, format_status, format_stop,
};
use super::Commands;

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Orchestrator(#[from] OrchestratorError),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

/// Text to print and whether the command achieved what it was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub text: String,
    pub success: bool,
}

impl CommandReport {
    fn new(text: String, success: bool) -> Self {
        Self { text, success }
    }
}

/// Build the orchestrator for a parsed command
pub fn build_orchestrator(command: &Commands) -> CommandResult<ClusterOrchestrator> {
    let settings = command.cluster_args().to_settings()?;
    let orchestrator = ClusterOrchestrator::new(settings);
    Ok(match command {
        Commands::Stg1(args) | Commands::Stg2(args) | Commands::Stg3(args) | Commands::Stg4(args) => {
            orchestrator.with_workers(args.workers)
        }
        _ => orchestrator,
    })
}

/// Run one command against `orchestrator`
pub async fn execute(
    command: &Commands,
    orchestrator: &ClusterOrchestrator,
) -> CommandResult<CommandReport> {
    let topology = &orchestrator.settings().topology;
    let report = match command {
        Commands::Init(_) => {
            let report = orchestrator.init().await?;
            CommandReport::new(format_init(&report, topology), true)
        }
        Commands::Start(_) => {
            let outcome = orchestrator.start().await?;
            CommandReport::new(format_start(&outcome), outcome.is_running())
        }
        Commands::Stop(_) => {
            let report = orchestrator.stop().await?;
            CommandReport::new(format_stop(&report), report.is_clean())
        }
        Commands::Status(_) => {
            let status = orchestrator.status()?;
            CommandReport::new(format_status(&status), true)
        }
        Commands::Clean(_) => {
            let outcome = orchestrator.clean().await?;
            CommandReport::new(format_clean(&outcome), true)
        }
        Commands::Stg1(_) => run_stage(orchestrator, Stage::Basic).await?,
        Commands::Stg2(_) => run_stage(orchestrator, Stage::BatchLinger).await?,
        Commands::Stg3(_) => run_stage(orchestrator, Stage::Compression).await?,
        Commands::Stg4(_) => run_stage(orchestrator, Stage::Partitions).await?,
    };
    Ok(report)
}

async fn run_stage(orchestrator: &ClusterOrchestrator, stage: Stage) -> CommandResult<CommandReport> {
    let report = orchestrator.run_stage(stage).await?;
    Ok(CommandReport::new(
        format_stage_report(&report),
        report.start.is_running(),
    ))
}
