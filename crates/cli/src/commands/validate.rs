//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{ContractError, PipelineConfiguration, RuntimeParameters, StageKind};
use serde::Serialize;
use stage_library::{builtin_registry, StageRegistry};
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    pipeline_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<PipelineSummary>,
}

#[derive(Serialize)]
struct PipelineSummary {
    pipeline_id: String,
    title: String,
    stage_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(pipeline = %args.pipeline.display(), "Validating pipeline definition");

    let registry = builtin_registry().context("Failed to build stage registry")?;
    let result = validate_pipeline(args, &registry);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Pipeline validation failed")
    }
}

fn validate_pipeline(args: &ValidateArgs, registry: &StageRegistry) -> ValidationResult {
    let pipeline_path = args.pipeline.display().to_string();
    let invalid = |error: String| ValidationResult {
        valid: false,
        pipeline_path: pipeline_path.clone(),
        error: Some(error),
        warnings: Vec::new(),
        summary: None,
    };

    if !args.pipeline.exists() {
        return invalid(format!("File not found: {}", args.pipeline.display()));
    }

    let definition = match ConfigLoader::load_from_path(&args.pipeline) {
        Ok(definition) => definition,
        Err(e) => return invalid(e.to_string()),
    };

    if let Err(e) = check_stages(&definition, registry) {
        return invalid(e);
    }

    ValidationResult {
        valid: true,
        pipeline_path: pipeline_path.clone(),
        error: None,
        warnings: collect_warnings(&definition),
        summary: Some(PipelineSummary {
            pipeline_id: definition.pipeline_id.clone(),
            title: definition.title.clone(),
            stage_count: definition.stages.len(),
            batch_size: definition.batch_size,
        }),
    }
}

/// Every stage must be registered, origin first and destination last
fn check_stages(
    definition: &PipelineConfiguration,
    registry: &StageRegistry,
) -> Result<(), String> {
    let last = definition.stages.len().saturating_sub(1);
    for (index, stage) in definition.stages.iter().enumerate() {
        let kind = registry
            .kind_of(&stage.library, &stage.stage_name)
            .ok_or_else(|| {
                format!(
                    "stage '{}': unknown stage {}/{}",
                    stage.instance_name, stage.library, stage.stage_name
                )
            })?;
        let expected = match index {
            0 => StageKind::Origin,
            i if i == last => StageKind::Destination,
            _ => StageKind::Processor,
        };
        if kind != expected {
            return Err(format!(
                "stage '{}' is a {kind} stage, {expected} required at position {index}",
                stage.instance_name
            ));
        }
    }
    Ok(())
}

/// Non-fatal issues: parameters that must be supplied at start
fn collect_warnings(definition: &PipelineConfiguration) -> Vec<String> {
    let params = definition.merge_parameters(&RuntimeParameters::new());
    definition
        .stages
        .iter()
        .filter_map(|stage| match stage.resolve(&params) {
            Err(ContractError::UnresolvedParameter { name, option }) => Some(format!(
                "stage '{}' option '{option}' needs runtime parameter '{name}'",
                stage.instance_name
            )),
            _ => None,
        })
        .collect()
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Pipeline is valid: {}", result.pipeline_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Pipeline: {}", summary.pipeline_id);
            if !summary.title.is_empty() {
                println!("  Title: {}", summary.title);
            }
            println!("  Stages: {}", summary.stage_count);
            if let Some(size) = summary.batch_size {
                println!("  Batch size: {size}");
            }
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Pipeline is invalid: {}", result.pipeline_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
