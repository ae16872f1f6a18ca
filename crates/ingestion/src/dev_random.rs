//! Synthetic random-number origin for demos and smoke tests

use std::time::Duration;

use async_trait::async_trait;
use contracts::{BatchMaker, Origin, Record, Stage, StageContext, StageError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

const FIELDS: &str = "fields";
const DELAY: &str = "delay";
const SEED: &str = "seed";

/// Emits `max_batch_size` records of random integers per call
///
/// The generator is seeded once at `init`, so consecutive batches differ.
#[derive(Debug, Default)]
pub struct RandomSource {
    instance_name: String,
    fields: Vec<String>,
    delay: Duration,
    rng: Option<StdRng>,
    produced: u64,
}

impl RandomSource {
    pub const LIBRARY: &'static str = "streamsets-datacollector-dev-lib";
    pub const STAGE_NAME: &'static str = "com_streamsets_pipeline_stage_devtest_RandomSource";
    pub const OFFSET: &'static str = "random";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Stage for RandomSource {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.instance_name = context.instance_name().to_string();

        self.fields = context
            .string(FIELDS)?
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();
        if self.fields.is_empty() {
            return Err(StageError::configuration(
                &self.instance_name,
                FIELDS,
                "at least one field name is required",
            ));
        }

        if context.get(DELAY).is_none() {
            return Err(StageError::configuration(
                &self.instance_name,
                DELAY,
                "required option is missing",
            ));
        }
        let delay_ms = context.float_or(DELAY, 0.0)?;
        if !delay_ms.is_finite() || delay_ms < 0.0 {
            return Err(StageError::configuration(
                &self.instance_name,
                DELAY,
                "must be a non-negative number of milliseconds",
            ));
        }
        self.delay = Duration::from_secs_f64(delay_ms / 1000.0);

        self.rng = Some(match context.get(SEED) {
            Some(_) => StdRng::seed_from_u64(context.integer(SEED)? as u64),
            None => StdRng::from_os_rng(),
        });

        info!(stage = %self.instance_name, fields = ?self.fields, "random origin initialized");
        Ok(())
    }
}

#[async_trait]
impl Origin for RandomSource {
    #[instrument(name = "random_produce", skip(self, batch), fields(stage = %self.instance_name))]
    async fn produce(
        &mut self,
        _last_offset: &str,
        max_batch_size: usize,
        batch: &mut BatchMaker,
    ) -> Result<Option<String>, StageError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let rng = self.rng.as_mut().ok_or_else(|| {
            StageError::Other(format!("stage '{}' not initialized", self.instance_name))
        })?;

        for _ in 0..max_batch_size {
            let value: Map<String, Value> = self
                .fields
                .iter()
                .map(|f| (f.clone(), Value::from(rng.random_range(0..i64::MAX))))
                .collect();
            self.produced += 1;
            batch.add_record(Record::new(
                format!("dev-random::{}", self.produced),
                Value::Object(value),
            ));
        }

        debug!(records = max_batch_size, "random batch produced");
        Ok(Some(Self::OFFSET.to_string()))
    }
}
