//! Agent settings resolved from the config file, environment and flags

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use config_loader::{AgentConfig, ConfigLoader};
use execution::{FilePipelineStore, PipelineManager};
use stage_library::builtin_registry;

use crate::cli::Cli;
use crate::error::CliError;

/// Effective agent settings
#[derive(Debug, Clone)]
pub struct Agent {
    pub config: AgentConfig,
}

impl Agent {
    /// Load the agent config file (if any) and apply CLI overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => load_config_file(path)?,
            None => AgentConfig::default(),
        };

        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(format) = cli.log_format {
            config.log.format = observability::LogFormat::from(format).to_string();
        }
        Ok(Self { config })
    }

    pub fn store(&self) -> FilePipelineStore {
        FilePipelineStore::new(&self.config.data_dir)
    }

    /// Manager over the file store with every built-in stage registered
    pub fn manager(&self) -> Result<PipelineManager<FilePipelineStore>> {
        let registry = builtin_registry().context("Failed to build stage registry")?;
        Ok(PipelineManager::new(
            Arc::new(self.store()),
            Arc::new(registry),
            self.config.execution.clone(),
        ))
    }
}

fn load_config_file(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.display().to_string()).into());
    }
    ConfigLoader::load_agent_config(path)
        .with_context(|| format!("Failed to load agent config from {}", path.display()))
}
