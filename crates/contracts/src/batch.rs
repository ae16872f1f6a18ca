//! Batch carrier and per-record error routing

use serde::Serialize;

use crate::{Record, StageError};

/// A record that a stage could not handle, with the reason
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub stage: String,
    pub record: Record,
    pub error: String,
}

/// Per-record error sink
///
/// Records routed here are excluded from the forward batch; the cycle
/// itself keeps going.
#[derive(Debug, Default)]
pub struct ErrorSink {
    records: Vec<ErrorRecord>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Into<String>, record: Record, error: &StageError) {
        self.records.push(ErrorRecord {
            stage: stage.into(),
            record,
            error: error.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn append(&mut self, other: ErrorSink) {
        self.records.extend(other.records);
    }

    pub fn into_records(self) -> Vec<ErrorRecord> {
        self.records
    }
}

/// Ordered, finite group of records moved through one cycle
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Collects the records emitted by one stage during one cycle
#[derive(Debug)]
pub struct BatchMaker {
    stage: String,
    records: Vec<Record>,
    errors: ErrorSink,
}

impl BatchMaker {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            records: Vec::new(),
            errors: ErrorSink::new(),
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Route a record to the error sink instead of the forward batch
    pub fn to_error(&mut self, record: Record, error: &StageError) {
        self.errors.push(self.stage.clone(), record, error);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_parts(self) -> (Batch, ErrorSink) {
        (Batch::new(self.records), self.errors)
    }
}
