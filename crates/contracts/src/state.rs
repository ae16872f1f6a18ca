//! Pipeline lifecycle state
//!
//! ```text
//! EDITED/STOPPED ──▶ STARTING ──▶ RUNNING ──▶ STOPPING ──▶ STOPPED
//!                       │            │  │
//!                       ▼            ▼  ▼
//!                  START_ERROR  RUN_ERROR  FINISHED
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Edited,
    Starting,
    Running,
    Stopping,
    Stopped,
    Finished,
    StartError,
    RunError,
    Disconnected,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edited => "EDITED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Finished => "FINISHED",
            Self::StartError => "START_ERROR",
            Self::RunError => "RUN_ERROR",
            Self::Disconnected => "DISCONNECTED",
        }
    }

    /// A run is in flight (or being set up / torn down)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }

    /// Offsets may only be discarded while nothing is running
    pub fn allows_offset_reset(&self) -> bool {
        matches!(self, Self::Stopped | Self::StartError | Self::RunError)
    }

    pub fn can_transition_to(&self, next: PipelineStatus) -> bool {
        use PipelineStatus::*;
        match (self, next) {
            (Edited | Stopped | Finished | StartError | RunError | Disconnected, Starting) => true,
            (Starting, Running | StartError | Stopping) => true,
            // Running -> Stopped only when recovering a run that died with the process
            (Running, Stopping | RunError | Finished | Stopped) => true,
            (Stopping, Stopped | RunError) => true,
            (Finished | Disconnected, Stopped) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle record for one pipeline id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub pipeline_id: String,
    pub status: PipelineStatus,
    /// Last committed offset; empty means start of stream
    #[serde(default)]
    pub last_offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineState {
    /// State of a pipeline that has never been run
    pub fn initial(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            status: PipelineStatus::Edited,
            last_offset: String::new(),
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Apply a transition, refreshing the timestamp
    ///
    /// The error message is replaced: `None` clears a previous error.
    pub fn transition(&mut self, status: PipelineStatus, error_message: Option<String>) {
        self.status = status;
        self.error_message = error_message;
        self.timestamp = Utc::now();
    }
}
