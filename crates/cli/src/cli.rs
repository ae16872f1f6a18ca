//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Edge agent - resumable data ingestion pipelines
#[derive(Parser, Debug)]
#[command(
    name = "edge-agent",
    author,
    version,
    about = "Edge data-ingestion agent",
    long_about = "Runs persisted ingestion pipelines (origin -> processors -> destination)\n\
                  with durable, resumable offsets."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "EDGE_AGENT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (defaults to the agent config file)
    #[arg(long, value_enum, global = true, env = "EDGE_AGENT_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Agent settings file (TOML)
    #[arg(short, long, global = true, env = "EDGE_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding pipeline definitions and state
    #[arg(long, global = true, env = "EDGE_AGENT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent, optionally starting one pipeline at boot
    Run(RunArgs),

    /// Validate a pipeline definition file without running it
    Validate(ValidateArgs),

    /// Display a pipeline definition summary
    Info(InfoArgs),

    /// Print the persisted state of a pipeline
    Status(StatusArgs),

    /// Discard the committed offset of a stopped pipeline
    ResetOffset(ResetOffsetArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Pipeline id to start once at boot
    #[arg(long, env = "EDGE_AGENT_START")]
    pub start: Option<String>,

    /// Runtime parameters as a JSON object, e.g. '{"SPOOL_DIR":"/var/log"}'
    #[arg(long, requires = "start", env = "EDGE_AGENT_RUNTIME_PARAMETERS")]
    pub runtime_parameters: Option<String>,

    /// Metrics server port (0 = disabled), overrides the agent config
    #[arg(long, env = "EDGE_AGENT_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Pipeline definition file (TOML or JSON)
    #[arg(short, long)]
    pub pipeline: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Pipeline definition file (TOML or JSON)
    #[arg(short, long)]
    pub pipeline: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `status` command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    pub pipeline_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `reset-offset` command
#[derive(Parser, Debug)]
pub struct ResetOffsetArgs {
    pub pipeline_id: String,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
