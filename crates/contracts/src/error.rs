//! Layered error definitions
//!
//! Categorized by source: contract (definitions, parameters) / stage

use thiserror::Error;

/// Errors raised while reading or resolving pipeline contracts
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// `${NAME}` reference with no matching parameter
    #[error("unresolved parameter '{name}' in option '{option}'")]
    UnresolvedParameter { name: String, option: String },
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration parse error with its underlying cause
    pub fn config_parse_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by stage plugins
#[derive(Debug, Error)]
pub enum StageError {
    /// Missing or malformed stage option
    #[error("stage '{stage}' option '{option}': {message}")]
    Configuration {
        stage: String,
        option: String,
        message: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Recoverable transport failure (network, remote unavailable)
    #[error("stage '{stage}' transient io error: {message}")]
    TransientIo { stage: String, message: String },

    /// A single record could not be converted
    #[error("record '{source_id}' conversion error: {message}")]
    RecordConversion { source_id: String, message: String },

    /// Destination rejected the batch
    #[error("stage '{stage}' destination error: {message}")]
    FatalDestination { stage: String, message: String },

    /// Offset string that the origin cannot interpret
    #[error("invalid offset '{offset}': {message}")]
    InvalidOffset { offset: String, message: String },

    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StageError {
    /// Create stage configuration error
    pub fn configuration(
        stage: impl Into<String>,
        option: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            stage: stage.into(),
            option: option.into(),
            message: message.into(),
        }
    }

    pub fn transient_io(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientIo {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn fatal_destination(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FatalDestination {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn invalid_offset(offset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOffset {
            offset: offset.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same cycle may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = StageError::configuration("spool", "conf.spoolDir", "missing");
        assert_eq!(
            err.to_string(),
            "stage 'spool' option 'conf.spoolDir': missing"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(StageError::transient_io("http", "connection refused").is_transient());
        assert!(!StageError::fatal_destination("http", "status 500").is_transient());
        assert!(!StageError::Other("boom".into()).is_transient());
    }

    #[test]
    fn test_contract_error_wraps_into_stage_error() {
        let err: StageError = ContractError::config_validation("x", "bad").into();
        assert!(matches!(err, StageError::Contract(_)));
    }
}
