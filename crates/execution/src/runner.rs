//! StandaloneRunner - per-pipeline lifecycle state machine and run loop driver
//!
//! ```text
//! start()  : STARTING ─init ok─▶ RUNNING ─spawn─▶ run loop
//!                 └─init err─▶ START_ERROR (stages torn down)
//! run loop : cycle ─ok─▶ commit offset ─▶ next cycle (stop flag checked here)
//!                 └─err─▶ RUN_ERROR (offset untouched)
//! stop()   : STOPPING ─signal + join─▶ STOPPED
//! ```
//!
//! Lifecycle calls (`start`, `stop`, `reset_offset`) are serialised by one
//! control lock. `status` reads a separate lock that the run loop only holds
//! for the duration of an in-memory update, so it never waits on a cycle.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use contracts::{ExecutionConfig, PipelineState, PipelineStatus, RuntimeParameters};
use stage_library::StageRegistry;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ExecutionError, Result};
use crate::metrics::{RunnerMetrics, RunnerMetricsSnapshot};
use crate::pipeline::ProductionPipeline;
use crate::store::PipelineStore;

/// Pause after a cycle that produced nothing and left the offset unchanged
const IDLE_BACKOFF: Duration = Duration::from_millis(50);

/// How a run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunExit {
    Stopped,
    Finished,
    Failed,
}

struct ActiveRun {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<RunExit>,
}

#[derive(Default)]
struct RunnerControl {
    active: Option<ActiveRun>,
}

/// State shared between the runner handle and its run loop
struct Shared<S> {
    pipeline_id: String,
    store: Arc<S>,
    state: RwLock<PipelineState>,
    /// Serialises store writes so persisted order matches in-memory order
    persist: Mutex<()>,
    metrics: RunnerMetrics,
}

impl<S: PipelineStore + Sync + 'static> Shared<S> {
    fn snapshot(&self) -> PipelineState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn last_offset(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_offset
            .clone()
    }

    /// Persist a lifecycle transition, then apply it
    ///
    /// The in-memory state only changes once the store accepted it.
    async fn transition(
        &self,
        next: PipelineStatus,
        error_message: Option<String>,
    ) -> Result<PipelineState> {
        let _guard = self.persist.lock().await;
        let mut candidate = self.snapshot();
        let previous = candidate.status;
        if !previous.can_transition_to(next) {
            return Err(ExecutionError::invalid_state(
                &self.pipeline_id,
                previous,
                "change state",
            ));
        }
        candidate.transition(next, error_message);

        self.store.save_state(&candidate).await?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = candidate.clone();
        observability::metrics::record_state_transition(&self.pipeline_id, next.as_str());
        info!(
            pipeline_id = %self.pipeline_id,
            from = %previous,
            to = %next,
            "pipeline state changed"
        );
        Ok(candidate)
    }

    /// Enter an error state, keeping it in memory if the store rejects it
    async fn record_error(&self, next: PipelineStatus, message: String) {
        match self.transition(next, Some(message.clone())).await {
            Ok(_) => {}
            Err(ExecutionError::Store(e)) => {
                error!(error = %e, status = %next, "error state not persisted");
                let _guard = self.persist.lock().await;
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if state.status.can_transition_to(next) {
                    state.transition(next, Some(message));
                }
            }
            Err(e) => warn!(error = %e, status = %next, "cannot record failure"),
        }
    }

    /// Persist a new committed offset, then apply it
    async fn commit_offset(&self, offset: String) -> Result<()> {
        let _guard = self.persist.lock().await;
        let mut candidate = self.snapshot();
        candidate.last_offset = offset;
        candidate.timestamp = Utc::now();
        self.store.save_state(&candidate).await?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = candidate;
        Ok(())
    }
}

/// Lifecycle driver for one pipeline id
pub struct StandaloneRunner<S> {
    shared: Arc<Shared<S>>,
    registry: Arc<StageRegistry>,
    execution: ExecutionConfig,
    control: Mutex<RunnerControl>,
}

impl<S: PipelineStore + Sync + 'static> StandaloneRunner<S> {
    /// Bind a runner to a stored pipeline
    ///
    /// Fails if no definition exists for `pipeline_id`. The persisted state is
    /// loaded as-is; a pipeline that never ran starts out EDITED.
    pub async fn new(
        pipeline_id: impl Into<String>,
        store: Arc<S>,
        registry: Arc<StageRegistry>,
        execution: ExecutionConfig,
    ) -> Result<Self> {
        let pipeline_id = pipeline_id.into();
        store.load_definition(&pipeline_id).await?;
        let state = store
            .load_state(&pipeline_id)
            .await?
            .unwrap_or_else(|| PipelineState::initial(&pipeline_id));
        debug!(pipeline_id = %pipeline_id, status = %state.status, "runner created");

        Ok(Self {
            shared: Arc::new(Shared {
                pipeline_id,
                store,
                state: RwLock::new(state),
                persist: Mutex::new(()),
                metrics: RunnerMetrics::new(),
            }),
            registry,
            execution,
            control: Mutex::new(RunnerControl::default()),
        })
    }

    pub fn pipeline_id(&self) -> &str {
        &self.shared.pipeline_id
    }

    /// Current state; never waits on the run loop
    pub fn status(&self) -> PipelineState {
        self.shared.snapshot()
    }

    pub fn metrics(&self) -> RunnerMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Start the pipeline
    ///
    /// Returns the RUNNING state once every stage initialised and the run
    /// loop is spawned.
    ///
    /// # Errors
    /// - `InvalidState` if a run is already active
    /// - stage, registry or parameter errors; the pipeline is then START_ERROR
    #[instrument(
        name = "start_pipeline",
        skip(self, runtime_parameters),
        fields(pipeline_id = %self.shared.pipeline_id)
    )]
    pub async fn start(&self, runtime_parameters: &RuntimeParameters) -> Result<PipelineState> {
        let mut control = self.control.lock().await;
        self.reap(&mut control).await;

        let status = self.shared.snapshot().status;
        if status.is_active() {
            return Err(ExecutionError::invalid_state(
                &self.shared.pipeline_id,
                status,
                "start",
            ));
        }

        let definition = self.shared.store.load_definition(&self.shared.pipeline_id).await?;
        self.shared.transition(PipelineStatus::Starting, None).await?;

        let mut pipeline =
            match ProductionPipeline::build(&definition, runtime_parameters, &self.registry) {
                Ok(pipeline) => pipeline,
                Err(e) => return Err(self.fail_start(e).await),
            };
        if let Err(e) = pipeline.init().await {
            return Err(self.fail_start(e).await);
        }

        let state = match self.shared.transition(PipelineStatus::Running, None).await {
            Ok(state) => state,
            Err(e) => {
                pipeline.destroy().await;
                return Err(self.fail_start(e).await);
            }
        };

        let batch_size = definition
            .batch_size
            .unwrap_or(self.execution.max_batch_size);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            pipeline,
            stop_rx,
            batch_size,
        ));
        control.active = Some(ActiveRun { stop_tx, handle });

        info!(batch_size, offset = %state.last_offset, "pipeline started");
        Ok(state)
    }

    /// Stop the pipeline cooperatively
    ///
    /// Waits for the in-flight cycle to finish. Stopping a pipeline that is
    /// not running returns its current state unchanged.
    #[instrument(
        name = "stop_pipeline",
        skip(self),
        fields(pipeline_id = %self.shared.pipeline_id)
    )]
    pub async fn stop(&self) -> Result<PipelineState> {
        let mut control = self.control.lock().await;

        if let Some(run) = control.active.take() {
            if run.handle.is_finished() {
                self.join(run.handle).await;
            } else {
                if let Err(e) = self.shared.transition(PipelineStatus::Stopping, None).await {
                    // the loop may have failed or finished concurrently
                    debug!(error = %e, "stop raced with run loop exit");
                }
                let _ = run.stop_tx.send(true);
                self.join(run.handle).await;
            }
        }

        // Nothing is running at this point; settle any leftover active state
        let status = self.shared.snapshot().status;
        if matches!(status, PipelineStatus::Starting | PipelineStatus::Running) {
            self.shared.transition(PipelineStatus::Stopping, None).await?;
        }
        let status = self.shared.snapshot().status;
        if matches!(
            status,
            PipelineStatus::Stopping | PipelineStatus::Finished | PipelineStatus::Disconnected
        ) {
            return self.shared.transition(PipelineStatus::Stopped, None).await;
        }

        Ok(self.shared.snapshot())
    }

    /// Discard ingestion progress
    ///
    /// # Errors
    /// `InvalidState` unless the pipeline is STOPPED, START_ERROR or RUN_ERROR
    #[instrument(name = "reset_offset", skip(self), fields(pipeline_id = %self.shared.pipeline_id))]
    pub async fn reset_offset(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        self.reap(&mut control).await;

        let status = self.shared.snapshot().status;
        if !status.allows_offset_reset() {
            return Err(ExecutionError::invalid_state(
                &self.shared.pipeline_id,
                status,
                "reset offset",
            ));
        }
        self.shared.commit_offset(String::new()).await?;
        info!("offset reset");
        Ok(())
    }

    /// Move to START_ERROR and hand the cause back
    async fn fail_start(&self, cause: ExecutionError) -> ExecutionError {
        error!(error = %cause, "pipeline failed to start");
        self.shared
            .record_error(PipelineStatus::StartError, cause.to_string())
            .await;
        cause
    }

    /// Join a run loop that already exited on its own
    async fn reap(&self, control: &mut RunnerControl) {
        if control
            .active
            .as_ref()
            .is_some_and(|run| run.handle.is_finished())
        {
            if let Some(run) = control.active.take() {
                self.join(run.handle).await;
            }
        }
    }

    async fn join(&self, handle: JoinHandle<RunExit>) {
        match handle.await {
            Ok(exit) => debug!(?exit, "run loop joined"),
            Err(e) => {
                error!(error = %e, "run loop task panicked");
                let message = format!("run loop aborted: {e}");
                self.shared
                    .record_error(PipelineStatus::RunError, message)
                    .await;
            }
        }
    }
}

/// Drive cycles until stopped, finished or failed
///
/// The stop flag is only observed between cycles.
#[instrument(
    name = "pipeline_run_loop",
    skip_all,
    fields(pipeline_id = %shared.pipeline_id)
)]
async fn run_loop<S: PipelineStore + Sync + 'static>(
    shared: Arc<Shared<S>>,
    mut pipeline: ProductionPipeline,
    mut stop_rx: watch::Receiver<bool>,
    batch_size: usize,
) -> RunExit {
    let exit = loop {
        // a dropped sender means the runner itself is gone
        if *stop_rx.borrow() || stop_rx.has_changed().is_err() {
            break RunExit::Stopped;
        }

        let last_offset = shared.last_offset();
        let outcome = match pipeline.run_one_cycle(&last_offset, batch_size).await {
            Ok(outcome) => outcome,
            Err(e) => break fail_run(&shared, e).await,
        };

        let records = outcome.records;
        let error_records = outcome.error_records.len();
        match outcome.offset {
            Some(offset) if offset != last_offset => {
                if let Err(e) = shared.commit_offset(offset).await {
                    break fail_run(&shared, e).await;
                }
                shared.metrics.record_commit(records, error_records);
                observability::metrics::record_batch_committed(
                    &shared.pipeline_id,
                    records,
                    error_records,
                );
            }
            Some(_) if records == 0 && error_records == 0 => {
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_BACKOFF) => {}
                    _ = stop_rx.changed() => {}
                }
            }
            Some(_) => {
                shared.metrics.record_commit(records, error_records);
            }
            None => {
                if records > 0 || error_records > 0 {
                    shared.metrics.record_commit(records, error_records);
                }
                info!("origin reached end of data");
                pipeline.destroy().await;
                match shared.transition(PipelineStatus::Finished, None).await {
                    Ok(_) => break RunExit::Finished,
                    Err(e @ ExecutionError::Store(_)) => break fail_run(&shared, e).await,
                    // a stop request is already settling the state
                    Err(_) => break RunExit::Stopped,
                }
            }
        }
    };

    pipeline.destroy().await;
    exit
}

async fn fail_run<S: PipelineStore + Sync + 'static>(
    shared: &Shared<S>,
    cause: ExecutionError,
) -> RunExit {
    error!(error = %cause, "pipeline cycle failed");
    shared.metrics.inc_failed_cycles();
    observability::metrics::record_cycle_failure(&shared.pipeline_id);
    shared
        .record_error(PipelineStatus::RunError, cause.to_string())
        .await;
    RunExit::Failed
}
