//! `reset-offset` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::agent::Agent;
use crate::cli::ResetOffsetArgs;

/// Execute the `reset-offset` command
pub async fn run_reset_offset(args: &ResetOffsetArgs, agent: &Agent) -> Result<()> {
    let manager = agent.manager()?;
    manager
        .reset_offset(&args.pipeline_id)
        .await
        .with_context(|| format!("Failed to reset offset of '{}'", args.pipeline_id))?;

    info!(pipeline_id = %args.pipeline_id, "Offset reset");
    println!("Offset of pipeline '{}' reset", args.pipeline_id);
    Ok(())
}
