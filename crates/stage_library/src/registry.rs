//! StageRegistry core implementation

use std::collections::BTreeMap;
use std::fmt;

use contracts::{StageInstance, StageKind};
use tracing::debug;

use crate::error::{RegistryError, Result};

/// Factory producing a fresh, uninitialised stage
pub type StageFactory = Box<dyn Fn() -> StageInstance + Send + Sync>;

/// Registry key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageKey {
    pub library: String,
    pub stage_name: String,
}

impl StageKey {
    pub fn new(library: impl Into<String>, stage_name: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            stage_name: stage_name.into(),
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.library, self.stage_name)
    }
}

struct Entry {
    kind: StageKind,
    factory: StageFactory,
}

/// Stage plugin registry
///
/// Populated once at startup, then only read.
#[derive(Default)]
pub struct StageRegistry {
    stages: BTreeMap<StageKey, Entry>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage factory
    ///
    /// The factory is invoked once here to record the stage's capability.
    /// Registering the same key twice fails.
    pub fn register<F>(
        &mut self,
        library: impl Into<String>,
        stage_name: impl Into<String>,
        factory: F,
    ) -> Result<()>
    where
        F: Fn() -> StageInstance + Send + Sync + 'static,
    {
        let key = StageKey::new(library, stage_name);
        if self.stages.contains_key(&key) {
            return Err(RegistryError::DuplicateStage {
                library: key.library,
                stage_name: key.stage_name,
            });
        }

        let kind = factory().kind();
        debug!(stage = %key, %kind, "stage registered");
        self.stages.insert(
            key,
            Entry {
                kind,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Create a new stage instance
    pub fn instantiate(&self, library: &str, stage_name: &str) -> Result<StageInstance> {
        let key = StageKey::new(library, stage_name);
        self.stages
            .get(&key)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| RegistryError::not_found(library, stage_name))
    }

    pub fn contains(&self, library: &str, stage_name: &str) -> bool {
        self.stages.contains_key(&StageKey::new(library, stage_name))
    }

    /// Capability of a registered stage without instantiating it
    pub fn kind_of(&self, library: &str, stage_name: &str) -> Option<StageKind> {
        self.stages
            .get(&StageKey::new(library, stage_name))
            .map(|entry| entry.kind)
    }

    /// Registered stages in key order
    pub fn stages(&self) -> impl Iterator<Item = (&StageKey, StageKind)> {
        self.stages.iter().map(|(key, entry)| (key, entry.kind))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contracts::{Batch, ErrorSink, Stage, StageContext, StageError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Discard;

    #[async_trait]
    impl Stage for Discard {
        async fn init(&mut self, _context: &StageContext) -> std::result::Result<(), StageError> {
            Ok(())
        }
    }

    #[async_trait]
    impl contracts::Destination for Discard {
        async fn write(
            &mut self,
            _batch: &Batch,
            _errors: &mut ErrorSink,
        ) -> std::result::Result<(), StageError> {
            Ok(())
        }
    }

    fn discard() -> StageInstance {
        StageInstance::Destination(Box::new(Discard))
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = StageRegistry::new();
        registry.register("lib", "discard", discard).unwrap();

        let stage = registry.instantiate("lib", "discard").unwrap();
        assert_eq!(stage.kind(), StageKind::Destination);
        assert_eq!(registry.kind_of("lib", "discard"), Some(StageKind::Destination));
        assert!(registry.contains("lib", "discard"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = StageRegistry::new();
        registry.register("lib", "discard", discard).unwrap();
        let err = registry.register("lib", "discard", discard).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateStage { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_stage() {
        let registry = StageRegistry::new();
        let err = registry.instantiate("lib", "missing").unwrap_err();
        assert_eq!(err.to_string(), "stage 'lib/missing' not found");
    }

    #[test]
    fn test_each_instantiate_calls_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = StageRegistry::new();
        registry
            .register("lib", "discard", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                discard()
            })
            .unwrap();

        registry.instantiate("lib", "discard").unwrap();
        registry.instantiate("lib", "discard").unwrap();
        // one call at registration to learn the kind plus two instances
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
