//! NullTarget - logs a batch summary via tracing and discards the records

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{Batch, Destination, ErrorSink, Stage, StageContext, StageError};
use tracing::{info, instrument};

use crate::metrics::DestinationMetrics;

#[derive(Debug, Default)]
pub struct NullTarget {
    name: String,
    metrics: Arc<DestinationMetrics>,
}

impl NullTarget {
    pub const LIBRARY: &'static str = "streamsets-datacollector-basic-lib";
    pub const STAGE_NAME: &'static str =
        "com_streamsets_pipeline_stage_destination_devnull_NullDTarget";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Arc<DestinationMetrics> {
        self.metrics.clone()
    }
}

#[async_trait]
impl Stage for NullTarget {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.name = context.instance_name().to_string();
        Ok(())
    }

    async fn destroy(&mut self) {
        info!(stage = %self.name, "NullTarget closed");
    }
}

#[async_trait]
impl Destination for NullTarget {
    #[instrument(
        name = "null_target_write",
        skip(self, batch, _errors),
        fields(stage = %self.name)
    )]
    async fn write(&mut self, batch: &Batch, _errors: &mut ErrorSink) -> Result<(), StageError> {
        let first = batch.records().first().map(|r| r.source_id());
        info!(
            stage = %self.name,
            records = batch.len(),
            first = ?first,
            "batch discarded"
        );
        self.metrics.inc_requests();
        self.metrics.add_records_written(batch.len() as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Record;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_null_target_write() {
        let mut target = NullTarget::new();
        target
            .init(&StageContext::new("p1", "null_01", BTreeMap::new()))
            .await
            .unwrap();

        let batch = Batch::new(vec![Record::new("a", "1"), Record::new("b", "2")]);
        let mut errors = ErrorSink::new();
        target.write(&batch, &mut errors).await.unwrap();

        assert!(errors.is_empty());
        assert_eq!(target.metrics().snapshot().records_written, 2);
        target.destroy().await;
    }
}
