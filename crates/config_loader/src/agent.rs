//! Agent-wide settings file (`edge-agent.toml`)

use std::path::PathBuf;

use contracts::ExecutionConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AgentConfig {
    /// Root of the pipeline store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    #[validate(nested)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    #[validate(nested)]
    pub log: LogSettings,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            execution: ExecutionConfig::default(),
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    #[validate(custom(function = "validate_level"))]
    pub level: String,

    /// json | pretty | compact
    #[serde(default = "default_format")]
    #[validate(custom(function = "validate_format"))]
    pub format: String,

    /// 0 disables the Prometheus listener
    #[serde(default)]
    pub metrics_port: u16,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            metrics_port: 0,
        }
    }
}

fn validate_level(level: &str) -> Result<(), validator::ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("unknown_log_level")),
    }
}

fn validate_format(format: &str) -> Result<(), validator::ValidationError> {
    match format {
        "json" | "pretty" | "compact" => Ok(()),
        _ => Err(validator::ValidationError::new("unknown_log_format")),
    }
}
