//! Scriptable stages shared by the execution unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use contracts::{
    Batch, BatchMaker, ConfigEntry, Destination, ErrorSink, Origin, PipelineConfiguration,
    Processor, Record, Stage, StageConfiguration, StageContext, StageError, StageInstance,
};
use stage_library::StageRegistry;

pub const LIB: &str = "test-lib";

/// Shared log of stage lifecycle events and delivered values
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    written: Arc<Mutex<Vec<i64>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn written(&self) -> Vec<i64> {
        self.written.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

/// Emits consecutive integers; the offset is the next integer as text
///
/// Options: `total` (finish after n records), `fail_at` (produce error when
/// the offset equals n), `fail_init`, `delay_ms`.
pub struct CountingOrigin {
    recorder: Recorder,
    name: String,
    total: Option<i64>,
    fail_at: Option<i64>,
    delay: Duration,
}

#[async_trait]
impl Stage for CountingOrigin {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.name = context.instance_name().to_string();
        self.recorder.push(format!("init:{}", self.name));
        if context.bool_or("fail_init", false)? {
            return Err(StageError::configuration(&self.name, "fail_init", "requested"));
        }
        self.total = context.get("total").map(|_| context.integer("total")).transpose()?;
        self.fail_at = context.get("fail_at").map(|_| context.integer("fail_at")).transpose()?;
        self.delay = Duration::from_millis(context.integer_or("delay_ms", 5)? as u64);
        Ok(())
    }

    async fn destroy(&mut self) {
        self.recorder.push(format!("destroy:{}", self.name));
    }
}

#[async_trait]
impl Origin for CountingOrigin {
    async fn produce(
        &mut self,
        last_offset: &str,
        max_batch_size: usize,
        batch: &mut BatchMaker,
    ) -> Result<Option<String>, StageError> {
        tokio::time::sleep(self.delay).await;
        let next: i64 = if last_offset.is_empty() {
            0
        } else {
            last_offset
                .parse()
                .map_err(|_| StageError::invalid_offset(last_offset, "not a number"))?
        };
        if self.fail_at == Some(next) {
            return Err(StageError::transient_io(&self.name, "source unavailable"));
        }
        let end = match self.total {
            Some(total) if next >= total => return Ok(None),
            Some(total) => total.min(next + max_batch_size as i64),
            None => next + max_batch_size as i64,
        };
        for i in next..end {
            batch.add_record(Record::new(format!("count::{i}"), i));
        }
        Ok(Some(end.to_string()))
    }
}

/// Routes records whose value is a multiple of `error_every` to the error sink
pub struct FilterProcessor {
    recorder: Recorder,
    name: String,
    error_every: i64,
}

#[async_trait]
impl Stage for FilterProcessor {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.name = context.instance_name().to_string();
        self.error_every = context.integer_or("error_every", 0)?;
        self.recorder.push(format!("init:{}", self.name));
        Ok(())
    }

    async fn destroy(&mut self) {
        self.recorder.push(format!("destroy:{}", self.name));
    }
}

#[async_trait]
impl Processor for FilterProcessor {
    async fn process(&mut self, batch: &Batch, output: &mut BatchMaker) -> Result<(), StageError> {
        for record in batch.records() {
            let value = record.value().as_i64().unwrap_or_default();
            if self.error_every > 0 && value % self.error_every == 0 {
                let err = StageError::RecordConversion {
                    source_id: record.source_id().to_string(),
                    message: "filtered".into(),
                };
                output.to_error(record.clone(), &err);
            } else {
                output.add_record(record.clone());
            }
        }
        Ok(())
    }
}

/// Collects written values; `fail` rejects every batch, `fail_init` fails init
pub struct CollectingDestination {
    recorder: Recorder,
    name: String,
    fail: bool,
}

#[async_trait]
impl Stage for CollectingDestination {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.name = context.instance_name().to_string();
        self.recorder.push(format!("init:{}", self.name));
        if context.bool_or("fail_init", false)? {
            return Err(StageError::configuration(&self.name, "fail_init", "requested"));
        }
        self.fail = context.bool_or("fail", false)?;
        Ok(())
    }

    async fn destroy(&mut self) {
        self.recorder.push(format!("destroy:{}", self.name));
    }
}

#[async_trait]
impl Destination for CollectingDestination {
    async fn write(&mut self, batch: &Batch, _errors: &mut ErrorSink) -> Result<(), StageError> {
        if self.fail {
            return Err(StageError::fatal_destination(&self.name, "HTTP 500"));
        }
        let mut written = self.recorder.written.lock().unwrap();
        written.extend(batch.records().iter().filter_map(|r| r.value().as_i64()));
        Ok(())
    }
}

pub fn registry(recorder: &Recorder) -> StageRegistry {
    let mut registry = StageRegistry::new();
    let p = recorder.clone();
    registry
        .register(LIB, "origin", move || {
            StageInstance::Origin(Box::new(CountingOrigin {
                recorder: p.clone(),
                name: String::new(),
                total: None,
                fail_at: None,
                delay: Duration::ZERO,
            }))
        })
        .unwrap();
    let p = recorder.clone();
    registry
        .register(LIB, "processor", move || {
            StageInstance::Processor(Box::new(FilterProcessor {
                recorder: p.clone(),
                name: String::new(),
                error_every: 0,
            }))
        })
        .unwrap();
    let p = recorder.clone();
    registry
        .register(LIB, "destination", move || {
            StageInstance::Destination(Box::new(CollectingDestination {
                recorder: p.clone(),
                name: String::new(),
                fail: false,
            }))
        })
        .unwrap();
    registry
}

pub fn stage(name: &str, stage_name: &str, configuration: Vec<ConfigEntry>) -> StageConfiguration {
    StageConfiguration {
        instance_name: name.to_string(),
        library: LIB.to_string(),
        stage_name: stage_name.to_string(),
        configuration,
    }
}

/// origin → destination with the given options
pub fn definition(
    pipeline_id: &str,
    origin: Vec<ConfigEntry>,
    destination: Vec<ConfigEntry>,
) -> PipelineConfiguration {
    PipelineConfiguration {
        pipeline_id: pipeline_id.to_string(),
        title: String::new(),
        description: String::new(),
        batch_size: Some(10),
        parameters: Vec::new(),
        stages: vec![
            stage("origin_01", "origin", origin),
            stage("dest_01", "destination", destination),
        ],
    }
}
