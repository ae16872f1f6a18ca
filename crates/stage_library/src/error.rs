//! Stage registry error types

use thiserror::Error;

/// Stage registry specific error
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Same (library, stage) registered twice
    #[error("stage '{library}/{stage_name}' is already registered")]
    DuplicateStage { library: String, stage_name: String },

    /// Unknown (library, stage)
    #[error("stage '{library}/{stage_name}' not found")]
    StageNotFound { library: String, stage_name: String },
}

impl RegistryError {
    pub fn not_found(library: impl Into<String>, stage_name: impl Into<String>) -> Self {
        Self::StageNotFound {
            library: library.into(),
            stage_name: stage_name.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RegistryError>;
