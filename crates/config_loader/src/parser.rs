//! Configuration parsing
//!
//! TOML (preferred) and JSON.

use contracts::ContractError;
use serde::de::DeserializeOwned;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (preferred)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    toml::from_str(content)
        .map_err(|e| ContractError::config_parse_with(format!("TOML parse error: {e}"), e))
}

pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    serde_json::from_str(content)
        .map_err(|e| ContractError::config_parse_with(format!("JSON parse error: {e}"), e))
}

/// Parse according to format
pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigValue, PipelineConfiguration};

    #[test]
    fn test_parse_toml_pipeline() {
        let content = r#"
pipeline_id = "tail"
title = "Tail logs"

[[parameters]]
name = "DIR"
value = "/var/log"

[[stages]]
instance_name = "spooler_01"
library = "basic"
stage_name = "spool"
[[stages.configuration]]
name = "conf.poolingTimeoutSecs"
value = 5

[[stages]]
instance_name = "null_01"
library = "basic"
stage_name = "null"
"#;
        let def: PipelineConfiguration = parse_toml(content).unwrap();
        assert_eq!(def.pipeline_id, "tail");
        assert_eq!(def.stages.len(), 2);
        assert_eq!(
            def.stages[0].configuration[0].value,
            ConfigValue::Integer(5)
        );
        assert!(def.stages[1].configuration.is_empty());
    }

    #[test]
    fn test_parse_json_pipeline() {
        let content = r#"{
            "pipeline_id": "p",
            "stages": [
                {"instance_name": "a", "library": "l", "stage_name": "s",
                 "configuration": [
                    {"name": "conf.headers", "value": [{"key": "k", "value": "v"}]}
                 ]},
                {"instance_name": "b", "library": "l", "stage_name": "d"}
            ]
        }"#;
        let def: PipelineConfiguration = parse_json(content).unwrap();
        let headers = def.stages[0].configuration[0].value.as_list().unwrap();
        assert_eq!(headers[0].as_map().unwrap()["key"].as_str(), Some("k"));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result: Result<PipelineConfiguration, _> = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
