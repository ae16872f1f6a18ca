//! PipelineManager - owns one runner per pipeline id

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{ExecutionConfig, PipelineState, RuntimeParameters};
use stage_library::StageRegistry;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::error::Result;
use crate::runner::StandaloneRunner;
use crate::store::PipelineStore;

/// Runner cache plus thin delegation of lifecycle calls
///
/// The cache lock is held while a missing runner is constructed, so racing
/// callers for the same unseen id all receive the first instance.
pub struct PipelineManager<S> {
    store: Arc<S>,
    registry: Arc<StageRegistry>,
    execution: ExecutionConfig,
    runners: Mutex<HashMap<String, Arc<StandaloneRunner<S>>>>,
}

impl<S: PipelineStore + Sync + 'static> PipelineManager<S> {
    pub fn new(store: Arc<S>, registry: Arc<StageRegistry>, execution: ExecutionConfig) -> Self {
        Self {
            store,
            registry,
            execution,
            runners: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// Cached runner for `pipeline_id`, created on first use
    pub async fn get_runner(&self, pipeline_id: &str) -> Result<Arc<StandaloneRunner<S>>> {
        let mut runners = self.runners.lock().await;
        if let Some(runner) = runners.get(pipeline_id) {
            return Ok(Arc::clone(runner));
        }

        let runner = Arc::new(
            StandaloneRunner::new(
                pipeline_id,
                Arc::clone(&self.store),
                Arc::clone(&self.registry),
                self.execution.clone(),
            )
            .await?,
        );
        runners.insert(pipeline_id.to_string(), Arc::clone(&runner));
        debug!(pipeline_id, "runner cached");
        Ok(runner)
    }

    #[instrument(name = "manager_start_pipeline", skip(self, runtime_parameters))]
    pub async fn start_pipeline(
        &self,
        pipeline_id: &str,
        runtime_parameters: &RuntimeParameters,
    ) -> Result<PipelineState> {
        self.get_runner(pipeline_id)
            .await?
            .start(runtime_parameters)
            .await
    }

    #[instrument(name = "manager_stop_pipeline", skip(self))]
    pub async fn stop_pipeline(&self, pipeline_id: &str) -> Result<PipelineState> {
        self.get_runner(pipeline_id).await?.stop().await
    }

    pub async fn reset_offset(&self, pipeline_id: &str) -> Result<()> {
        self.get_runner(pipeline_id).await?.reset_offset().await
    }

    pub async fn get_status(&self, pipeline_id: &str) -> Result<PipelineState> {
        Ok(self.get_runner(pipeline_id).await?.status())
    }

    /// Ids with a cached runner, sorted
    pub async fn runner_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runners.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every cached runner; errors are logged, not returned
    #[instrument(name = "manager_stop_all", skip(self))]
    pub async fn stop_all(&self) {
        let runners: Vec<_> = self.runners.lock().await.values().cloned().collect();
        for runner in runners {
            match runner.stop().await {
                Ok(state) => info!(
                    pipeline_id = %runner.pipeline_id(),
                    status = %state.status,
                    "pipeline stopped"
                ),
                Err(e) => error!(
                    pipeline_id = %runner.pipeline_id(),
                    error = %e,
                    "failed to stop pipeline"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPipelineStore;
    use crate::test_support::{self, Recorder};
    use contracts::PipelineStatus;

    fn manager(recorder: &Recorder) -> Arc<PipelineManager<MemoryPipelineStore>> {
        let store = Arc::new(MemoryPipelineStore::new());
        store.insert_definition(test_support::definition("p1", vec![], vec![]));
        store.insert_definition(test_support::definition("p2", vec![], vec![]));
        Arc::new(PipelineManager::new(
            store,
            Arc::new(test_support::registry(recorder)),
            ExecutionConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_concurrent_get_runner_returns_same_instance() {
        let recorder = Recorder::default();
        let manager = manager(&recorder);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.get_runner("p1").await.unwrap() })
            })
            .collect();
        let mut runners = Vec::new();
        for task in tasks {
            runners.push(task.await.unwrap());
        }
        assert!(runners.iter().all(|r| Arc::ptr_eq(r, &runners[0])));
        assert_eq!(manager.runner_ids().await, vec!["p1"]);

        // concurrent starts on the shared runner initialise stages once
        let starts: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    manager.start_pipeline("p1", &RuntimeParameters::new()).await
                })
            })
            .collect();
        let mut ok = 0;
        for start in starts {
            if start.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(recorder.count("init:origin_01"), 1);

        manager.stop_all().await;
        assert_eq!(
            manager.get_status("p1").await.unwrap().status,
            PipelineStatus::Stopped
        );
    }

    #[tokio::test]
    async fn test_delegation_and_unknown_pipeline() {
        let recorder = Recorder::default();
        let manager = manager(&recorder);

        assert!(manager.get_runner("missing").await.is_err());
        assert!(manager.runner_ids().await.is_empty());

        let state = manager
            .start_pipeline("p2", &RuntimeParameters::new())
            .await
            .unwrap();
        assert_eq!(state.status, PipelineStatus::Running);
        assert!(manager.reset_offset("p2").await.is_err());

        let state = manager.stop_pipeline("p2").await.unwrap();
        assert_eq!(state.status, PipelineStatus::Stopped);
        manager.reset_offset("p2").await.unwrap();
        assert_eq!(manager.get_status("p2").await.unwrap().last_offset, "");
    }
}
