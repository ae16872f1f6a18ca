//! `run` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{PipelineStatus, RuntimeParameters};
use execution::{FilePipelineStore, PipelineManager};
use tracing::{info, warn};

use crate::agent::Agent;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Interval between status checks of the boot pipeline
const STATUS_POLL: Duration = Duration::from_millis(500);

/// Execute the `run` command
pub async fn run_agent(args: &RunArgs, agent: &Agent) -> Result<()> {
    let manager = Arc::new(agent.manager()?);

    let Some(pipeline_id) = args.start.as_deref() else {
        info!("No pipeline to start; waiting for shutdown signal");
        setup_shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipelines...");
        manager.stop_all().await;
        return Ok(());
    };

    let params = parse_runtime_parameters(args.runtime_parameters.as_deref())?;
    let state = start_at_boot(&manager, pipeline_id, &params).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("Failed to serialize pipeline state")?
    );

    let result = tokio::select! {
        result = wait_for_exit(&manager, pipeline_id) => result,
        _ = setup_shutdown_signal() => {
            warn!("Received shutdown signal, stopping pipelines...");
            Ok(())
        }
    };

    manager.stop_all().await;
    info!("Edge agent finished");
    result
}

/// Start `pipeline_id`, stopping a run left RUNNING by a previous process first
async fn start_at_boot(
    manager: &PipelineManager<FilePipelineStore>,
    pipeline_id: &str,
    params: &RuntimeParameters,
) -> Result<contracts::PipelineState> {
    let current = manager
        .get_status(pipeline_id)
        .await
        .with_context(|| format!("Failed to load pipeline '{pipeline_id}'"))?;

    if current.status == PipelineStatus::Running {
        warn!(pipeline_id, "Pipeline was left RUNNING, stopping before restart");
        manager.stop_pipeline(pipeline_id).await?;
    }

    manager
        .start_pipeline(pipeline_id, params)
        .await
        .with_context(|| format!("Failed to start pipeline '{pipeline_id}'"))
}

/// Resolve once the pipeline leaves the active states
async fn wait_for_exit(
    manager: &PipelineManager<FilePipelineStore>,
    pipeline_id: &str,
) -> Result<()> {
    loop {
        tokio::time::sleep(STATUS_POLL).await;
        let state = manager.get_status(pipeline_id).await?;
        match state.status {
            status if status.is_active() => continue,
            PipelineStatus::RunError | PipelineStatus::StartError => {
                return Err(CliError::PipelineFailed {
                    pipeline_id: pipeline_id.to_string(),
                    status: state.status.to_string(),
                    message: state.error_message.unwrap_or_default(),
                }
                .into());
            }
            status => {
                info!(pipeline_id, %status, offset = %state.last_offset, "Pipeline completed");
                return Ok(());
            }
        }
    }
}

/// Decode `--runtime-parameters`; absent means none
pub(crate) fn parse_runtime_parameters(raw: Option<&str>) -> Result<RuntimeParameters> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(RuntimeParameters::new());
    };
    serde_json::from_str(raw)
        .map_err(|e| CliError::runtime_parameters(format!("expected a JSON object: {e}")).into())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
