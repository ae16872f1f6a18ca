//! Pipeline definition validation
//!
//! Rules:
//! - pipeline_id is non-empty
//! - at least one origin and one destination (two stages)
//! - stage instance names are non-empty and unique
//! - library / stage_name are non-empty
//! - batch_size > 0 when present

use std::collections::HashSet;

use contracts::{ContractError, PipelineConfiguration};

/// Validate a pipeline definition
///
/// Returns the first error encountered.
pub fn validate(definition: &PipelineConfiguration) -> Result<(), ContractError> {
    validate_pipeline_id(definition)?;
    validate_stage_count(definition)?;
    validate_stages(definition)?;
    validate_batch_size(definition)?;
    Ok(())
}

fn validate_pipeline_id(definition: &PipelineConfiguration) -> Result<(), ContractError> {
    if definition.pipeline_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "pipeline_id",
            "pipeline_id cannot be empty",
        ));
    }
    Ok(())
}

fn validate_stage_count(definition: &PipelineConfiguration) -> Result<(), ContractError> {
    if definition.stages.len() < 2 {
        return Err(ContractError::config_validation(
            "stages",
            format!(
                "a pipeline needs an origin and a destination, got {} stage(s)",
                definition.stages.len()
            ),
        ));
    }
    Ok(())
}

/// Instance names unique, identifiers present
fn validate_stages(definition: &PipelineConfiguration) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, stage) in definition.stages.iter().enumerate() {
        if stage.instance_name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("stages[{idx}].instance_name"),
                "instance_name cannot be empty",
            ));
        }
        if !seen.insert(stage.instance_name.as_str()) {
            return Err(ContractError::config_validation(
                format!("stages[instance_name={}]", stage.instance_name),
                "duplicate instance_name",
            ));
        }
        if stage.library.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("stages[{}].library", stage.instance_name),
                "library cannot be empty",
            ));
        }
        if stage.stage_name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("stages[{}].stage_name", stage.instance_name),
                "stage_name cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_batch_size(definition: &PipelineConfiguration) -> Result<(), ContractError> {
    if definition.batch_size == Some(0) {
        return Err(ContractError::config_validation(
            "batch_size",
            "batch_size must be > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StageConfiguration;

    fn stage(name: &str) -> StageConfiguration {
        StageConfiguration {
            instance_name: name.to_string(),
            library: "lib".to_string(),
            stage_name: "stage".to_string(),
            configuration: Vec::new(),
        }
    }

    fn valid() -> PipelineConfiguration {
        PipelineConfiguration {
            pipeline_id: "p1".into(),
            title: String::new(),
            description: String::new(),
            batch_size: None,
            parameters: Vec::new(),
            stages: vec![stage("origin"), stage("dest")],
        }
    }

    #[test]
    fn test_valid_definition() {
        assert!(validate(&valid()).is_ok());
    }

    #[test]
    fn test_empty_pipeline_id() {
        let mut def = valid();
        def.pipeline_id = " ".into();
        let err = validate(&def).unwrap_err();
        assert!(err.to_string().contains("pipeline_id"));
    }

    #[test]
    fn test_single_stage_rejected() {
        let mut def = valid();
        def.stages.pop();
        assert!(validate(&def).is_err());
    }

    #[test]
    fn test_duplicate_instance_name() {
        let mut def = valid();
        def.stages[1].instance_name = "origin".into();
        let err = validate(&def).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_library() {
        let mut def = valid();
        def.stages[0].library.clear();
        let err = validate(&def).unwrap_err();
        assert!(err.to_string().contains("library"));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut def = valid();
        def.batch_size = Some(0);
        assert!(validate(&def).is_err());
    }
}
