//! Pipeline metric recorders
//!
//! Thin wrappers over the `metrics` facade; without an installed recorder
//! they are no-ops.

use metrics::{counter, gauge, histogram};

/// A batch was written and its offset committed
pub fn record_batch_committed(pipeline_id: &str, records: usize, error_records: usize) {
    let pipeline = pipeline_id.to_string();
    counter!("edge_agent_batches_committed_total", "pipeline" => pipeline.clone()).increment(1);
    counter!("edge_agent_records_written_total", "pipeline" => pipeline.clone())
        .increment(records as u64);
    if error_records > 0 {
        counter!("edge_agent_error_records_total", "pipeline" => pipeline.clone())
            .increment(error_records as u64);
    }
    histogram!("edge_agent_batch_size", "pipeline" => pipeline).record(records as f64);
}

/// Lifecycle transition into `status`
pub fn record_state_transition(pipeline_id: &str, status: &str) {
    counter!(
        "edge_agent_state_transitions_total",
        "pipeline" => pipeline_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// A cycle aborted with a hard failure
pub fn record_cycle_failure(pipeline_id: &str) {
    counter!("edge_agent_cycle_failures_total", "pipeline" => pipeline_id.to_string()).increment(1);
}

/// Files matched by the last spool directory scan
pub fn record_files_scanned(stage: &str, count: usize) {
    gauge!("edge_agent_spool_files", "stage" => stage.to_string()).set(count as f64);
}
