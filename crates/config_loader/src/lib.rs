//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON pipeline definitions
//! - Validate definition legality
//! - Load the agent settings file
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let definition = ConfigLoader::load_from_path(Path::new("pipeline.toml")).unwrap();
//! println!("Pipeline: {}", definition.pipeline_id);
//! ```

mod agent;
mod parser;
mod validator;

pub use agent::{AgentConfig, LogSettings};
pub use contracts::PipelineConfiguration;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use ::validator::Validate;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a pipeline definition from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<PipelineConfiguration, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a pipeline definition from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineConfiguration, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Load the agent settings file (TOML)
    pub fn load_agent_config(path: &Path) -> Result<AgentConfig, ContractError> {
        let content = Self::read_file(path)?;
        Self::agent_config_from_str(&content)
    }

    pub fn agent_config_from_str(content: &str) -> Result<AgentConfig, ContractError> {
        let config: AgentConfig = parser::parse_toml(content)?;
        config
            .validate()
            .map_err(|e| ContractError::config_validation("agent", e.to_string()))?;
        Ok(config)
    }

    /// Serialize a definition to TOML string
    pub fn to_toml(definition: &PipelineConfiguration) -> Result<String, ContractError> {
        toml::to_string_pretty(definition)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a definition to JSON string
    pub fn to_json(definition: &PipelineConfiguration) -> Result<String, ContractError> {
        serde_json::to_string_pretty(definition)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    pub fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        std::fs::read_to_string(path).map_err(|e| {
            ContractError::config_parse_with(format!("cannot read {}: {e}", path.display()), e)
        })
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PipelineConfiguration, ContractError> {
        let definition = parser::parse(content, format)?;
        validator::validate(&definition)?;
        Ok(definition)
    }
}
