//! `status` command implementation.

use anyhow::{Context, Result};
use tracing::debug;

use crate::agent::Agent;
use crate::cli::StatusArgs;

/// Execute the `status` command
pub async fn run_status(args: &StatusArgs, agent: &Agent) -> Result<()> {
    let manager = agent.manager()?;
    let state = manager
        .get_status(&args.pipeline_id)
        .await
        .with_context(|| format!("Failed to load pipeline '{}'", args.pipeline_id))?;
    debug!(pipeline_id = %state.pipeline_id, status = %state.status, "Status loaded");

    if args.json {
        let json = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
        println!("{json}");
    } else {
        println!("Pipeline: {}", state.pipeline_id);
        println!("  Status: {}", state.status);
        let offset = if state.last_offset.is_empty() {
            "(start of data)"
        } else {
            state.last_offset.as_str()
        };
        println!("  Offset: {offset}");
        println!("  Updated: {}", state.timestamp.to_rfc3339());
        if let Some(error) = &state.error_message {
            println!("  Error: {error}");
        }
    }
    Ok(())
}
