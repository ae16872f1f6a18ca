//! Batch execution loop
//!
//! A [`ProductionPipeline`] owns the initialised stages of one pipeline and
//! runs one produce → process → write cycle at a time. The offset returned by
//! the origin is only handed back to the caller after the destination accepted
//! the batch; any hard failure leaves the committed offset untouched.

use contracts::{
    BatchMaker, ErrorRecord, ErrorSink, PipelineConfiguration, RuntimeParameters,
    StageContext, StageInstance, StageKind,
};
use stage_library::StageRegistry;
use tracing::{debug, info, instrument, warn};

use crate::error::{ExecutionError, Result};

/// One stage plus the resolved context it was built with
#[derive(Debug)]
struct StageRuntime {
    instance_name: String,
    context: StageContext,
    stage: StageInstance,
    initialized: bool,
}

/// Result of one successful cycle
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Offset to commit; `None` means the origin reached end of data
    pub offset: Option<String>,
    /// Records accepted by the destination
    pub records: usize,
    pub error_records: Vec<ErrorRecord>,
}

/// Stages of one pipeline wired origin → processors → destination
#[derive(Debug)]
pub struct ProductionPipeline {
    pipeline_id: String,
    stages: Vec<StageRuntime>,
}

impl ProductionPipeline {
    /// Resolve parameters and instantiate every stage
    ///
    /// Stages are created but not initialised.
    pub fn build(
        definition: &PipelineConfiguration,
        runtime_parameters: &RuntimeParameters,
        registry: &StageRegistry,
    ) -> Result<Self> {
        let pipeline_id = definition.pipeline_id.clone();
        let params = definition.merge_parameters(runtime_parameters);

        let mut stages = Vec::with_capacity(definition.stages.len());
        for conf in &definition.stages {
            let config = conf.resolve(&params)?;
            let stage = registry.instantiate(&conf.library, &conf.stage_name)?;
            stages.push(StageRuntime {
                instance_name: conf.instance_name.clone(),
                context: StageContext::new(&pipeline_id, &conf.instance_name, config),
                stage,
                initialized: false,
            });
        }

        check_layout(&pipeline_id, &stages)?;
        Ok(Self {
            pipeline_id,
            stages,
        })
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Instance names in declared order
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.instance_name.as_str())
    }

    /// Initialise stages in declared order
    ///
    /// On the first failure every stage already initialised is destroyed in
    /// reverse order before the error is returned.
    #[instrument(name = "pipeline_init", skip(self), fields(pipeline_id = %self.pipeline_id))]
    pub async fn init(&mut self) -> Result<()> {
        for index in 0..self.stages.len() {
            let runtime = &mut self.stages[index];
            match runtime.stage.init(&runtime.context).await {
                Ok(()) => {
                    runtime.initialized = true;
                    debug!(
                        stage = %runtime.instance_name,
                        kind = %runtime.stage.kind(),
                        "stage initialised"
                    );
                }
                Err(e) => {
                    let stage = runtime.instance_name.clone();
                    warn!(stage = %stage, error = %e, "stage init failed, rolling back");
                    self.destroy().await;
                    return Err(ExecutionError::stage(stage, e));
                }
            }
        }
        info!(stages = self.stages.len(), "pipeline initialised");
        Ok(())
    }

    /// Destroy initialised stages in reverse order; idempotent
    pub async fn destroy(&mut self) {
        for runtime in self.stages.iter_mut().rev() {
            if runtime.initialized {
                runtime.stage.destroy().await;
                runtime.initialized = false;
                debug!(stage = %runtime.instance_name, "stage destroyed");
            }
        }
    }

    /// Run one produce → process → write cycle
    ///
    /// An empty batch skips processors and the destination but still returns
    /// the origin's offset.
    #[instrument(
        name = "run_one_cycle",
        skip(self, last_offset),
        fields(pipeline_id = %self.pipeline_id)
    )]
    pub async fn run_one_cycle(
        &mut self,
        last_offset: &str,
        max_batch_size: usize,
    ) -> Result<CycleOutcome> {
        let (origin, rest) = self
            .stages
            .split_first_mut()
            .ok_or_else(|| ExecutionError::invalid_pipeline(&self.pipeline_id, "no stages"))?;

        let mut maker = BatchMaker::new(&origin.instance_name);
        let offset = match &mut origin.stage {
            StageInstance::Origin(stage) => stage
                .produce(last_offset, max_batch_size, &mut maker)
                .await
                .map_err(|e| ExecutionError::stage(&origin.instance_name, e))?,
            _ => {
                return Err(ExecutionError::invalid_pipeline(
                    &self.pipeline_id,
                    "first stage is not an origin",
                ))
            }
        };

        let (mut batch, mut errors) = maker.into_parts();
        if batch.is_empty() {
            log_error_records(&errors);
            return Ok(CycleOutcome {
                offset,
                records: 0,
                error_records: errors.into_records(),
            });
        }

        for runtime in rest.iter_mut() {
            match &mut runtime.stage {
                StageInstance::Processor(stage) => {
                    let mut output = BatchMaker::new(&runtime.instance_name);
                    stage
                        .process(&batch, &mut output)
                        .await
                        .map_err(|e| ExecutionError::stage(&runtime.instance_name, e))?;
                    let (next, stage_errors) = output.into_parts();
                    errors.append(stage_errors);
                    batch = next;
                }
                StageInstance::Destination(stage) => {
                    let mut sink = ErrorSink::new();
                    stage
                        .write(&batch, &mut sink)
                        .await
                        .map_err(|e| ExecutionError::stage(&runtime.instance_name, e))?;
                    let rejected = sink.len();
                    errors.append(sink);

                    log_error_records(&errors);
                    let records = batch.len().saturating_sub(rejected);
                    debug!(records, errors = errors.len(), "batch written");
                    return Ok(CycleOutcome {
                        offset,
                        records,
                        error_records: errors.into_records(),
                    });
                }
                StageInstance::Origin(_) => break,
            }
        }

        Err(ExecutionError::invalid_pipeline(
            &self.pipeline_id,
            "pipeline has no destination",
        ))
    }
}

fn log_error_records(errors: &ErrorSink) {
    for record in errors.records() {
        warn!(
            stage = %record.stage,
            source_id = %record.record.source_id(),
            error = %record.error,
            "record sent to error sink"
        );
    }
}

/// Origin first, destination last, processors in between
fn check_layout(pipeline_id: &str, stages: &[StageRuntime]) -> Result<()> {
    let kinds: Vec<StageKind> = stages.iter().map(|s| s.stage.kind()).collect();
    let invalid = |message: String| Err(ExecutionError::invalid_pipeline(pipeline_id, message));

    match kinds.as_slice() {
        [] | [_] => invalid("a pipeline needs an origin and a destination".to_string()),
        [first, middle @ .., last] => {
            if *first != StageKind::Origin {
                return invalid(format!("stage '{}' must be an origin", stages[0].instance_name));
            }
            if *last != StageKind::Destination {
                let name = &stages[stages.len() - 1].instance_name;
                return invalid(format!("stage '{name}' must be a destination"));
            }
            if let Some(pos) = middle.iter().position(|k| *k != StageKind::Processor) {
                let name = &stages[pos + 1].instance_name;
                return invalid(format!("stage '{name}' must be a processor"));
            }
            Ok(())
        }
    }
}
