//! Execution tuning shared by the runner and the agent config file

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExecutionConfig {
    /// Upper bound on records requested from the origin per cycle
    #[serde(default = "default_max_batch_size")]
    #[validate(range(min = 1, max = 100000))]
    pub max_batch_size: usize,
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}
