use std::process;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use kraftlab::cli::{build_orchestrator, env_file_from_args, execute, Cli};

#[tokio::main]
async fn main() {
    // Env files must be loaded before clap reads option defaults from the
    // environment
    let raw_args: Vec<String> = std::env::args().collect();
    let env_file = env_file_from_args(&raw_args);
    let env_loaded = match &env_file {
        Some(path) => dotenvy::from_path(path).map(|_| path.clone()),
        None => dotenvy::dotenv(),
    };

    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match env_loaded {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if env_file.is_some() => {
            error!("Failed to load env file: {}", e);
            process::exit(1);
        }
        Err(_) => {}
    }

    let orchestrator = match build_orchestrator(&cli.command) {
        Ok(o) => o,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    match execute(&cli.command, &orchestrator).await {
        Ok(report) => {
            print!("{}", report.text);
            if !report.success {
                process::exit(1);
            }
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
