//! Directory spooler origin
//!
//! Turns a directory of text files into an ordered, resumable stream of
//! line records. All progress lives in the offset string; a fresh instance
//! given the same offset resumes at the same place.

mod config;
mod offset;
mod reader;
mod scanner;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{BatchMaker, Origin, Record, Stage, StageContext, StageError};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub use config::{ReadOrder, SpoolDirConfig};
pub use offset::SpoolOffset;

use scanner::{key_for_path, Snapshot, SortKey, SpoolFile};

/// Record header attribute: full file path
pub const HEADER_FILE: &str = "file";
/// Record header attribute: bare file name
pub const HEADER_FILE_NAME: &str = "filename";
/// Record header attribute: byte offset the line began at
pub const HEADER_OFFSET: &str = "offset";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spool directory origin
#[derive(Debug, Default)]
pub struct SpoolDirSource {
    instance_name: String,
    config: Option<SpoolDirConfig>,
    /// Ordering key of the initial-file override
    initial_key: Option<SortKey>,
    /// Files read to the end by this instance; never reopened
    exhausted: HashSet<PathBuf>,
}

impl SpoolDirSource {
    pub const LIBRARY: &'static str = "streamsets-datacollector-basic-lib";
    pub const STAGE_NAME: &'static str =
        "com_streamsets_pipeline_stage_origin_spooldir_SpoolDirDSource";

    pub fn new() -> Self {
        Self::default()
    }

    fn config(&self) -> Result<&SpoolDirConfig, StageError> {
        self.config
            .as_ref()
            .ok_or_else(|| {
                StageError::Other(format!("stage '{}' not initialized", self.instance_name))
            })
    }

    /// Next file to open given the current cursor
    fn select_next(&self, snapshot: &Snapshot, cursor: Option<&SpoolOffset>) -> Option<SpoolFile> {
        match cursor {
            Some(current) => {
                snapshot.first_after(&current.sort_key(), &current.file, &self.exhausted)
            }
            None => match &self.initial_key {
                Some(key) => snapshot.first_at_or_after(key),
                None => snapshot.first(),
            },
        }
        .cloned()
    }

    /// Read from the cursor into `batch`; returns the advanced cursor and
    /// whether anything was emitted
    async fn read_into(
        &self,
        cursor: &SpoolOffset,
        max_batch_size: usize,
        batch: &mut BatchMaker,
    ) -> Result<(SpoolOffset, bool), StageError> {
        let len = match tokio::fs::metadata(&cursor.file).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(file = %cursor.file.display(), "spool file disappeared, moving on");
                return Ok((cursor.clone(), false));
            }
            Err(e) => return Err(e.into()),
        };
        if len <= cursor.offset {
            return Ok((cursor.clone(), false));
        }

        let chunk = reader::read_lines(&cursor.file, cursor.offset, max_batch_size).await?;
        let path = cursor.file.display().to_string();
        let file_name = cursor
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let emitted = !chunk.lines.is_empty();
        for line in chunk.lines {
            let source_id = format!("{path}::{}", line.offset);
            let record = |value: String| {
                Record::new(source_id.clone(), value)
                    .with_attribute(HEADER_FILE, path.clone())
                    .with_attribute(HEADER_FILE_NAME, file_name.clone())
                    .with_attribute(HEADER_OFFSET, line.offset.to_string())
            };
            match String::from_utf8(line.bytes) {
                Ok(text) => batch.add_record(record(text)),
                Err(e) => {
                    let error = StageError::RecordConversion {
                        source_id: source_id.clone(),
                        message: format!("line is not valid UTF-8: {e}"),
                    };
                    let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
                    batch.to_error(record(lossy), &error);
                }
            }
        }

        let next = SpoolOffset {
            offset: chunk.next_offset,
            ..cursor.clone()
        };
        Ok((next, emitted))
    }
}

#[async_trait]
impl Stage for SpoolDirSource {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.instance_name = context.instance_name().to_string();
        self.exhausted.clear();
        let config = SpoolDirConfig::from_context(context)?;

        self.initial_key = match &config.initial_file {
            None => None,
            Some(path) => Some(key_for_path(path, config.read_order).map_err(|e| {
                StageError::configuration(
                    &self.instance_name,
                    "conf.initialFileToProcess",
                    format!("cannot stat '{}': {e}", path.display()),
                )
            })?),
        };

        info!(
            stage = %self.instance_name,
            spool_dir = %config.spool_dir.display(),
            order = ?config.read_order,
            recursive = config.process_subdirectories,
            "spooler initialized"
        );
        self.config = Some(config);
        Ok(())
    }
}

#[async_trait]
impl Origin for SpoolDirSource {
    #[instrument(
        name = "spooler_produce",
        skip(self, batch),
        fields(stage = %self.instance_name)
    )]
    async fn produce(
        &mut self,
        last_offset: &str,
        max_batch_size: usize,
        batch: &mut BatchMaker,
    ) -> Result<Option<String>, StageError> {
        if max_batch_size == 0 {
            return Ok(Some(last_offset.to_string()));
        }
        let config = self.config()?.clone();
        let deadline = Instant::now() + config.polling_timeout;

        let mut cursor = SpoolOffset::decode(last_offset)?;
        let mut moved = false;

        loop {
            if let Some(current) = &cursor {
                let (next, emitted) = self.read_into(current, max_batch_size, batch).await?;
                if next != *current {
                    moved = true;
                    cursor = Some(next);
                }
                if emitted {
                    break;
                }
            }

            let snapshot = scanner::scan_async(config.clone()).await?;
            observability::metrics::record_files_scanned(&self.instance_name, snapshot.len());
            self.exhausted.retain(|path| snapshot.contains(path));

            match self.select_next(&snapshot, cursor.as_ref()) {
                Some(file) => {
                    if let Some(done) = &cursor {
                        self.exhausted.insert(done.file.clone());
                    }
                    debug!(file = %file.path.display(), "opening spool file");
                    cursor = Some(SpoolOffset::start_of(file.path, file.modified_ns));
                    moved = true;
                }
                None => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!("no spool file available before polling timeout");
                        break;
                    }
                    tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
                }
            }
        }

        match cursor {
            Some(current) if moved => current.encode().map(Some),
            _ => Ok(Some(last_offset.to_string())),
        }
    }
}
