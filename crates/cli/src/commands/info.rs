//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::PipelineConfiguration;
use serde::Serialize;
use stage_library::{builtin_registry, StageRegistry};
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Pipeline info for JSON output
#[derive(Serialize)]
struct PipelineInfo {
    pipeline_id: String,
    title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    parameters: Vec<ParameterInfo>,
    stages: Vec<StageInfo>,
}

#[derive(Serialize)]
struct ParameterInfo {
    name: String,
    default: String,
}

#[derive(Serialize)]
struct StageInfo {
    instance_name: String,
    library: String,
    stage_name: String,
    /// `origin` / `processor` / `destination`, `unknown` if not registered
    kind: String,
    options: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(pipeline = %args.pipeline.display(), "Loading pipeline info");

    if !args.pipeline.exists() {
        return Err(CliError::file_not_found(args.pipeline.display().to_string()).into());
    }

    let definition = ConfigLoader::load_from_path(&args.pipeline)
        .with_context(|| format!("Failed to load pipeline from {}", args.pipeline.display()))?;
    let registry = builtin_registry().context("Failed to build stage registry")?;
    let info = build_pipeline_info(&definition, &registry);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize pipeline info")?;
        println!("{json}");
    } else {
        print_pipeline_info(&info);
    }

    Ok(())
}

fn build_pipeline_info(
    definition: &PipelineConfiguration,
    registry: &StageRegistry,
) -> PipelineInfo {
    let parameters = definition
        .parameters
        .iter()
        .map(|p| ParameterInfo {
            name: p.name.clone(),
            default: p.value.to_string(),
        })
        .collect();

    let stages = definition
        .stages
        .iter()
        .map(|s| StageInfo {
            instance_name: s.instance_name.clone(),
            library: s.library.clone(),
            stage_name: s.stage_name.clone(),
            kind: registry
                .kind_of(&s.library, &s.stage_name)
                .map_or_else(|| "unknown".to_string(), |k| k.to_string()),
            options: s.configuration.len(),
        })
        .collect();

    PipelineInfo {
        pipeline_id: definition.pipeline_id.clone(),
        title: definition.title.clone(),
        description: definition.description.clone(),
        batch_size: definition.batch_size,
        parameters,
        stages,
    }
}

fn print_pipeline_info(info: &PipelineInfo) {
    println!("Pipeline {}", info.pipeline_id);
    if !info.title.is_empty() {
        println!("   ├─ Title: {}", info.title);
    }
    if !info.description.is_empty() {
        println!("   ├─ Description: {}", info.description);
    }
    match info.batch_size {
        Some(size) => println!("   └─ Batch size: {size}"),
        None => println!("   └─ Batch size: (agent default)"),
    }

    if !info.parameters.is_empty() {
        println!("\nParameters ({})", info.parameters.len());
        for (i, param) in info.parameters.iter().enumerate() {
            let prefix = if i == info.parameters.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} = {}", prefix, param.name, param.default);
        }
    }

    println!("\nStages ({})", info.stages.len());
    for (i, stage) in info.stages.iter().enumerate() {
        let prefix = if i == info.stages.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} [{}] {}/{} ({} options)",
            prefix, stage.instance_name, stage.kind, stage.library, stage.stage_name, stage.options
        );
    }
    println!();
}
