//! Pipeline definition and state persistence
//!
//! File layout under the data directory:
//! ```text
//! pipelines/<id>/pipeline.{json,toml}   definition
//! runInfo/<id>/pipelineState.json       lifecycle state + committed offset
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use config_loader::ConfigLoader;
use contracts::{PipelineConfiguration, PipelineState};
use tracing::debug;

use crate::error::StoreError;

const DEFINITION_FILES: [&str; 2] = ["pipeline.json", "pipeline.toml"];
const STATE_FILE: &str = "pipelineState.json";

/// Persistence boundary for pipeline definitions and lifecycle state
#[trait_variant::make(PipelineStore: Send)]
pub trait LocalPipelineStore {
    /// Load the stored definition
    ///
    /// # Errors
    /// `DefinitionNotFound` when the id has no definition
    async fn load_definition(&self, pipeline_id: &str)
        -> Result<PipelineConfiguration, StoreError>;

    /// Last persisted state, `None` if the pipeline never ran
    async fn load_state(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError>;

    /// Persist state; must be durable once this returns
    async fn save_state(&self, state: &PipelineState) -> Result<(), StoreError>;
}

fn check_id(pipeline_id: &str) -> Result<(), StoreError> {
    let valid = !pipeline_id.is_empty()
        && pipeline_id != "."
        && pipeline_id != ".."
        && !pipeline_id.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidPipelineId {
            pipeline_id: pipeline_id.to_string(),
        })
    }
}

/// File-backed store
#[derive(Debug, Clone)]
pub struct FilePipelineStore {
    root: PathBuf,
}

impl FilePipelineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn definition_dir(&self, pipeline_id: &str) -> PathBuf {
        self.root.join("pipelines").join(pipeline_id)
    }

    pub fn state_path(&self, pipeline_id: &str) -> PathBuf {
        self.root.join("runInfo").join(pipeline_id).join(STATE_FILE)
    }

    /// Store a definition as JSON
    pub async fn save_definition(
        &self,
        definition: &PipelineConfiguration,
    ) -> Result<(), StoreError> {
        check_id(&definition.pipeline_id)?;
        let dir = self.definition_dir(&definition.pipeline_id);
        tokio::fs::create_dir_all(&dir).await?;
        let json = ConfigLoader::to_json(definition)?;
        write_atomic(&dir.join(DEFINITION_FILES[0]), json.as_bytes()).await
    }

    /// Ids of every stored definition
    pub async fn list_pipelines(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.root.join("pipelines")).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Write to a sibling temp file, then rename over the target
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl PipelineStore for FilePipelineStore {
    async fn load_definition(
        &self,
        pipeline_id: &str,
    ) -> Result<PipelineConfiguration, StoreError> {
        check_id(pipeline_id)?;
        let dir = self.definition_dir(pipeline_id);
        for name in DEFINITION_FILES {
            let path = dir.join(name);
            if tokio::fs::try_exists(&path).await? {
                let definition =
                    tokio::task::spawn_blocking(move || ConfigLoader::load_from_path(&path))
                        .await
                        .map_err(std::io::Error::other)??;
                return Ok(definition);
            }
        }
        Err(StoreError::DefinitionNotFound {
            pipeline_id: pipeline_id.to_string(),
        })
    }

    async fn load_state(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError> {
        check_id(pipeline_id)?;
        match tokio::fs::read(self.state_path(pipeline_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_state(&self, state: &PipelineState) -> Result<(), StoreError> {
        check_id(&state.pipeline_id)?;
        let path = self.state_path(&state.pipeline_id);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        write_atomic(&path, &json).await?;
        debug!(pipeline_id = %state.pipeline_id, status = %state.status, "state persisted");
        Ok(())
    }
}

/// In-memory store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryPipelineStore {
    definitions: Mutex<HashMap<String, PipelineConfiguration>>,
    states: Mutex<HashMap<String, PipelineState>>,
    history: Mutex<Vec<PipelineState>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_definition(&self, definition: PipelineConfiguration) {
        if let Ok(mut defs) = self.definitions.lock() {
            defs.insert(definition.pipeline_id.clone(), definition);
        }
    }

    pub fn insert_state(&self, state: PipelineState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(state.pipeline_id.clone(), state);
        }
    }

    /// Every state written, in order
    pub fn history(&self) -> Vec<PipelineState> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Io(std::io::Error::other("memory store lock poisoned"))
}

impl PipelineStore for MemoryPipelineStore {
    async fn load_definition(
        &self,
        pipeline_id: &str,
    ) -> Result<PipelineConfiguration, StoreError> {
        self.definitions
            .lock()
            .map_err(|_| poisoned())?
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| StoreError::DefinitionNotFound {
                pipeline_id: pipeline_id.to_string(),
            })
    }

    async fn load_state(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError> {
        Ok(self
            .states
            .lock()
            .map_err(|_| poisoned())?
            .get(pipeline_id)
            .cloned())
    }

    async fn save_state(&self, state: &PipelineState) -> Result<(), StoreError> {
        self.states
            .lock()
            .map_err(|_| poisoned())?
            .insert(state.pipeline_id.clone(), state.clone());
        self.history.lock().map_err(|_| poisoned())?.push(state.clone());
        Ok(())
    }
}
