//! LocalFileTarget - appends one line per record to a local file

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use contracts::{Batch, Destination, ErrorSink, Stage, StageContext, StageError};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use crate::metrics::DestinationMetrics;

const FILE_PATH: &str = "conf.filePath";

/// Strings are written verbatim, other values as JSON
#[derive(Debug, Default)]
pub struct LocalFileTarget {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    metrics: Arc<DestinationMetrics>,
}

impl LocalFileTarget {
    pub const LIBRARY: &'static str = "streamsets-datacollector-basic-lib";
    pub const STAGE_NAME: &'static str =
        "com_streamsets_pipeline_stage_destination_localfilesystem_LocalFileSystemDTarget";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Arc<DestinationMetrics> {
        self.metrics.clone()
    }
}

#[async_trait]
impl Stage for LocalFileTarget {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.name = context.instance_name().to_string();
        self.path = PathBuf::from(context.string(FILE_PATH)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                let message = format!("cannot create directory: {e}");
                StageError::configuration(&self.name, FILE_PATH, message)
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                StageError::configuration(&self.name, FILE_PATH, format!("cannot open: {e}"))
            })?;

        debug!(stage = %self.name, path = %self.path.display(), "LocalFileTarget opened");
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    async fn destroy(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush().await {
                warn!(stage = %self.name, error = %e, "flush on close failed");
            }
        }
    }
}

#[async_trait]
impl Destination for LocalFileTarget {
    #[instrument(
        name = "local_file_target_write",
        skip(self, batch, errors),
        fields(stage = %self.name, records = batch.len())
    )]
    async fn write(&mut self, batch: &Batch, errors: &mut ErrorSink) -> Result<(), StageError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StageError::Other(format!("stage '{}' not initialized", self.name)))?;

        let mut written = 0u64;
        for record in batch.records() {
            match record.value_as_text() {
                Ok(line) => {
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    written += 1;
                }
                Err(e) => {
                    let error = StageError::RecordConversion {
                        source_id: record.source_id().to_string(),
                        message: e.to_string(),
                    };
                    errors.push(self.name.clone(), record.clone(), &error);
                    self.metrics.inc_error_records();
                }
            }
        }
        writer.flush().await?;

        self.metrics.inc_requests();
        self.metrics.add_records_written(written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigValue, Record};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn context(path: &std::path::Path) -> StageContext {
        let mut config = BTreeMap::new();
        config.insert(
            FILE_PATH.to_string(),
            ConfigValue::from(path.to_str().unwrap()),
        );
        StageContext::new("p1", "file_01", config)
    }

    #[tokio::test]
    async fn test_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/records.txt");

        let mut target = LocalFileTarget::new();
        target.init(&context(&path)).await.unwrap();
        let mut errors = ErrorSink::new();
        target
            .write(
                &Batch::new(vec![Record::new("a", "123"), Record::new("b", json!({"n": 1}))]),
                &mut errors,
            )
            .await
            .unwrap();
        target
            .write(&Batch::new(vec![Record::new("c", "456")]), &mut errors)
            .await
            .unwrap();
        target.destroy().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "123\n{\"n\":1}\n456\n");
        assert_eq!(target.metrics().snapshot().records_written, 3);
    }

    #[tokio::test]
    async fn test_missing_path_fails_init() {
        let mut target = LocalFileTarget::new();
        let err = target
            .init(&StageContext::new("p1", "file_01", BTreeMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Configuration { .. }));
    }
}
