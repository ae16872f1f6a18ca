//! Stage capability traits
//!
//! Every stage supports `init`/`destroy`; capabilities are layered on top as
//! separate traits. The execution loop only ever calls through these traits
//! and never special-cases a concrete stage type.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::{Batch, BatchMaker, ConfigValue, ErrorSink, StageError};

/// Resolved configuration handed to a stage at `init`
#[derive(Debug, Clone)]
pub struct StageContext {
    pipeline_id: String,
    instance_name: String,
    config: BTreeMap<String, ConfigValue>,
}

impl StageContext {
    pub fn new(
        pipeline_id: impl Into<String>,
        instance_name: impl Into<String>,
        config: BTreeMap<String, ConfigValue>,
    ) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            instance_name: instance_name.into(),
            config,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Raw value; `Null` counts as absent
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.config.get(name).filter(|v| !v.is_null())
    }

    fn invalid(&self, name: &str, message: impl Into<String>) -> StageError {
        StageError::configuration(&self.instance_name, name, message)
    }

    fn required(&self, name: &str) -> Result<&ConfigValue, StageError> {
        self.get(name)
            .ok_or_else(|| self.invalid(name, "required option is missing"))
    }

    /// Required non-empty string
    pub fn string(&self, name: &str) -> Result<String, StageError> {
        match self.required(name)? {
            ConfigValue::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            ConfigValue::String(_) => Err(self.invalid(name, "must not be empty")),
            ConfigValue::Integer(_) | ConfigValue::Float(_) | ConfigValue::Bool(_) => {
                Ok(self.required(name)?.to_string())
            }
            _ => Err(self.invalid(name, "expected a string")),
        }
    }

    /// Optional string; empty strings count as absent
    pub fn optional_string(&self, name: &str) -> Result<Option<String>, StageError> {
        match self.get(name) {
            None => Ok(None),
            Some(ConfigValue::String(s)) if s.trim().is_empty() => Ok(None),
            Some(_) => self.string(name).map(Some),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, StageError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(name, format!("expected a boolean, got '{v}'"))),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, StageError> {
        let v = self.required(name)?;
        v.as_i64()
            .ok_or_else(|| self.invalid(name, format!("expected an integer, got '{v}'")))
    }

    pub fn integer_or(&self, name: &str, default: i64) -> Result<i64, StageError> {
        match self.get(name) {
            None => Ok(default),
            Some(_) => self.integer(name),
        }
    }

    pub fn float_or(&self, name: &str, default: f64) -> Result<f64, StageError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| self.invalid(name, format!("expected a number, got '{v}'"))),
        }
    }

    /// List option; absent means empty
    pub fn list(&self, name: &str) -> Result<Vec<ConfigValue>, StageError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(ConfigValue::List(items)) => Ok(items.clone()),
            Some(_) => Err(self.invalid(name, "expected a list")),
        }
    }
}

/// Lifecycle shared by every stage
#[async_trait]
pub trait Stage: Send {
    /// Validate configuration and acquire resources
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError>;

    /// Release resources; called once, in reverse init order
    async fn destroy(&mut self) {}
}

/// Stage that produces records from an external source
#[async_trait]
pub trait Origin: Stage {
    /// Fill `batch` with at most `max_batch_size` records resuming at `last_offset`.
    ///
    /// Returns the new offset, or `None` when the source is exhausted for good.
    async fn produce(
        &mut self,
        last_offset: &str,
        max_batch_size: usize,
        batch: &mut BatchMaker,
    ) -> Result<Option<String>, StageError>;
}

/// Stage that transforms one batch into the next
#[async_trait]
pub trait Processor: Stage {
    async fn process(&mut self, batch: &Batch, output: &mut BatchMaker) -> Result<(), StageError>;
}

/// Stage that delivers a batch externally
#[async_trait]
pub trait Destination: Stage {
    /// Per-record failures go to `errors`; an `Err` rejects the whole batch
    async fn write(&mut self, batch: &Batch, errors: &mut ErrorSink) -> Result<(), StageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Origin,
    Processor,
    Destination,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => f.write_str("origin"),
            Self::Processor => f.write_str("processor"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// A stage instance tagged with its capability
pub enum StageInstance {
    Origin(Box<dyn Origin>),
    Processor(Box<dyn Processor>),
    Destination(Box<dyn Destination>),
}

impl StageInstance {
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Origin(_) => StageKind::Origin,
            Self::Processor(_) => StageKind::Processor,
            Self::Destination(_) => StageKind::Destination,
        }
    }

    pub async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        match self {
            Self::Origin(s) => s.init(context).await,
            Self::Processor(s) => s.init(context).await,
            Self::Destination(s) => s.init(context).await,
        }
    }

    pub async fn destroy(&mut self) {
        match self {
            Self::Origin(s) => s.destroy().await,
            Self::Processor(s) => s.destroy().await,
            Self::Destination(s) => s.destroy().await,
        }
    }
}

impl fmt::Debug for StageInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StageInstance").field(&self.kind()).finish()
    }
}
