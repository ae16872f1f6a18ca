//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// File named on the command line does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// `--runtime-parameters` is not a JSON object
    #[error("Invalid runtime parameters: {message}")]
    RuntimeParameters { message: String },

    /// A started pipeline stopped with an error
    #[error("Pipeline '{pipeline_id}' ended in {status}: {message}")]
    PipelineFailed {
        pipeline_id: String,
        status: String,
        message: String,
    },
}

impl CliError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn runtime_parameters(message: impl Into<String>) -> Self {
        Self::RuntimeParameters {
            message: message.into(),
        }
    }
}
