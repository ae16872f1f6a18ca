//! # Dispatcher
//!
//! Destination stages: deliver a committed batch outside the agent.
//!
//! - [`HttpClientTarget`]: POST records to an HTTP endpoint
//! - [`LocalFileTarget`]: append records as lines to a local file
//! - [`NullTarget`]: log a batch summary and discard

pub mod metrics;
pub mod sinks;

pub use metrics::{DestinationMetrics, MetricsSnapshot};
pub use sinks::{HttpClientTarget, LocalFileTarget, NullTarget};
