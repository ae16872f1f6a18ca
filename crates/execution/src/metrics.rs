//! Per-runner counters, readable without touching the run loop

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

#[derive(Debug, Default)]
pub struct RunnerMetrics {
    batches_committed: AtomicU64,
    records_written: AtomicU64,
    error_records: AtomicU64,
    failed_cycles: AtomicU64,
    /// Unix millis of the last committed batch, 0 if none
    last_batch_unix_ms: AtomicU64,
}

impl RunnerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_commit(&self, records: usize, error_records: usize) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.records_written
            .fetch_add(records as u64, Ordering::Relaxed);
        self.error_records
            .fetch_add(error_records as u64, Ordering::Relaxed);
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last_batch_unix_ms.store(now, Ordering::Relaxed);
    }

    pub fn inc_failed_cycles(&self) {
        self.failed_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> RunnerMetricsSnapshot {
        RunnerMetricsSnapshot {
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            error_records: self.error_records.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            last_batch_unix_ms: self.last_batch_unix_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunnerMetricsSnapshot {
    pub batches_committed: u64,
    pub records_written: u64,
    pub error_records: u64,
    pub failed_cycles: u64,
    pub last_batch_unix_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_updates_counters() {
        let metrics = RunnerMetrics::new();
        metrics.record_commit(10, 2);
        metrics.record_commit(5, 0);
        metrics.inc_failed_cycles();

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_committed, 2);
        assert_eq!(snap.records_written, 15);
        assert_eq!(snap.error_records, 2);
        assert_eq!(snap.failed_cycles, 1);
        assert!(snap.last_batch_unix_ms > 0);
    }
}
