//! Stages shipped with the agent

use contracts::StageInstance;
use dispatcher::{HttpClientTarget, LocalFileTarget, NullTarget};
use ingestion::{RandomSource, SpoolDirSource};

use crate::error::Result;
use crate::registry::StageRegistry;

/// Registry holding every built-in stage
pub fn builtin_registry() -> Result<StageRegistry> {
    let mut registry = StageRegistry::new();

    registry.register(SpoolDirSource::LIBRARY, SpoolDirSource::STAGE_NAME, || {
        StageInstance::Origin(Box::new(SpoolDirSource::new()))
    })?;
    registry.register(RandomSource::LIBRARY, RandomSource::STAGE_NAME, || {
        StageInstance::Origin(Box::new(RandomSource::new()))
    })?;
    registry.register(HttpClientTarget::LIBRARY, HttpClientTarget::STAGE_NAME, || {
        StageInstance::Destination(Box::new(HttpClientTarget::new()))
    })?;
    registry.register(LocalFileTarget::LIBRARY, LocalFileTarget::STAGE_NAME, || {
        StageInstance::Destination(Box::new(LocalFileTarget::new()))
    })?;
    registry.register(NullTarget::LIBRARY, NullTarget::STAGE_NAME, || {
        StageInstance::Destination(Box::new(NullTarget::new()))
    })?;

    Ok(registry)
}
