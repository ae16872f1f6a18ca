//! Execution error types

use contracts::{ContractError, PipelineStatus, StageError};
use stage_library::RegistryError;
use thiserror::Error;

/// Pipeline store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No persisted definition for this id
    #[error("pipeline '{pipeline_id}' not found")]
    DefinitionNotFound { pipeline_id: String },

    /// Id that cannot be used as a storage key
    #[error("invalid pipeline id '{pipeline_id}'")]
    InvalidPipelineId { pipeline_id: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Runner / manager errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Operation not permitted in the current lifecycle state
    #[error("pipeline '{pipeline_id}' is {status}, cannot {operation}")]
    InvalidState {
        pipeline_id: String,
        status: PipelineStatus,
        operation: &'static str,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("stage registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Stage failure, tagged with the stage instance name
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: StageError,
    },

    /// Stage layout is not origin, processors..., destination
    #[error("invalid pipeline '{pipeline_id}': {message}")]
    InvalidPipeline { pipeline_id: String, message: String },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ExecutionError {
    pub fn invalid_state(
        pipeline_id: impl Into<String>,
        status: PipelineStatus,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            pipeline_id: pipeline_id.into(),
            status,
            operation,
        }
    }

    pub fn stage(stage: impl Into<String>, source: StageError) -> Self {
        Self::Stage {
            stage: stage.into(),
            source,
        }
    }

    pub fn invalid_pipeline(pipeline_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPipeline {
            pipeline_id: pipeline_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ExecutionError>;
