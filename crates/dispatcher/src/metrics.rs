//! Destination metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single destination instance
#[derive(Debug, Default)]
pub struct DestinationMetrics {
    /// Records delivered
    records_written: AtomicU64,
    /// Outbound requests / write calls
    requests: AtomicU64,
    /// Batches rejected as a whole
    failure_count: AtomicU64,
    /// Records routed to the error sink
    error_records: AtomicU64,
}

impl DestinationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_records_written(&self, n: u64) {
        self.records_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_error_records(&self) {
        self.error_records.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            error_records: self.error_records.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of destination metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub records_written: u64,
    pub requests: u64,
    pub failure_count: u64,
    pub error_records: u64,
}
