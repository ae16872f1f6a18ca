//! Pipeline definition, as persisted by the authoring layer

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConfigValue, ContractError, RuntimeParameters};

/// One `{name, value}` option pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    #[serde(default)]
    pub value: ConfigValue,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Stage declaration inside a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfiguration {
    pub instance_name: String,
    pub library: String,
    pub stage_name: String,
    #[serde(default)]
    pub configuration: Vec<ConfigEntry>,
}

impl StageConfiguration {
    /// Resolve every option against runtime parameters
    pub fn resolve(
        &self,
        params: &RuntimeParameters,
    ) -> Result<BTreeMap<String, ConfigValue>, ContractError> {
        self.configuration
            .iter()
            .map(|entry| Ok((entry.name.clone(), entry.value.resolve(&entry.name, params)?)))
            .collect()
    }
}

/// Complete pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfiguration {
    pub pipeline_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Overrides the agent-wide max batch size when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// Default runtime parameters
    #[serde(default)]
    pub parameters: Vec<ConfigEntry>,
    pub stages: Vec<StageConfiguration>,
}

impl PipelineConfiguration {
    /// Definition defaults overlaid with caller-supplied parameters
    pub fn merge_parameters(&self, runtime: &RuntimeParameters) -> RuntimeParameters {
        let mut merged: RuntimeParameters = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        merged.extend(runtime.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn origin(&self) -> Option<&StageConfiguration> {
        self.stages.first()
    }

    pub fn destination(&self) -> Option<&StageConfiguration> {
        self.stages.last()
    }
}
