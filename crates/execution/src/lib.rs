//! # Execution
//!
//! Pipeline execution: the batch loop, the per-pipeline runner state machine
//! and the manager that owns runners.
//!
//! ```text
//! PipelineManager ──get_runner(id)──▶ StandaloneRunner ──spawn──▶ run loop
//!                                          │                        │
//!                                     PipelineStore          ProductionPipeline
//!                                   (definition + state)   origin → … → destination
//! ```
//!
//! Offsets are committed only after the destination accepted a batch, which
//! gives at-least-once delivery across restarts.

pub mod error;
pub mod manager;
pub mod metrics;
pub mod pipeline;
pub mod runner;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{ExecutionError, Result, StoreError};
pub use manager::PipelineManager;
pub use metrics::{RunnerMetrics, RunnerMetricsSnapshot};
pub use pipeline::{CycleOutcome, ProductionPipeline};
pub use runner::StandaloneRunner;
pub use store::{FilePipelineStore, LocalPipelineStore, MemoryPipelineStore, PipelineStore};
