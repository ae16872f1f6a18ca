//! # Edge Agent CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Agent config loading (file, `EDGE_AGENT_*` env, flags)
//! - Pipeline start at boot and graceful shutdown
//! - Offline validation, inspection and state maintenance

mod agent;
mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat as OutputFormat, ObservabilityConfig};
use tracing::info;

use agent::Agent;
use cli::{Cli, Commands};
use commands::{run_agent, run_info, run_reset_offset, run_status, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let agent = Agent::load(&cli)?;

    init_logging(&cli, &agent)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %agent.config.data_dir.display(),
        "Edge agent starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_agent(args, &agent).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Status(args) => run_status(args, &agent).await,
        Commands::ResetOffset(args) => run_reset_offset(args, &agent).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging from CLI verbosity and the agent log settings
fn init_logging(cli: &Cli, agent: &Agent) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => agent.config.log.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let metrics_port = match &cli.command {
        Commands::Run(args) => args.metrics_port.unwrap_or(agent.config.log.metrics_port),
        _ => 0,
    };

    let log_format = agent
        .config
        .log
        .format
        .parse::<OutputFormat>()
        .map_err(anyhow::Error::msg)?;

    observability::init_with_config(ObservabilityConfig {
        log_format,
        metrics_port: (metrics_port != 0).then_some(metrics_port),
        default_log_level,
    })
}
