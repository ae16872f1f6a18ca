//! Spooler offset encoding
//!
//! The offset string is a small JSON document naming the open file, the byte
//! position within it and the ordering key it was selected under. An empty
//! string means start of stream.

use std::path::PathBuf;

use contracts::StageError;
use serde::{Deserialize, Serialize};

use crate::spooler::scanner::SortKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoolOffset {
    pub file: PathBuf,
    pub offset: u64,
    /// Modification time (ns) used for ordering; 0 under lexicographical order
    #[serde(default)]
    pub modified_ns: u64,
}

impl SpoolOffset {
    pub fn start_of(file: PathBuf, modified_ns: u64) -> Self {
        Self {
            file,
            offset: 0,
            modified_ns,
        }
    }

    /// Decode; `None` for the empty (start of stream) offset
    pub fn decode(raw: &str) -> Result<Option<Self>, StageError> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| StageError::invalid_offset(raw, e.to_string()))
    }

    pub fn encode(&self) -> Result<String, StageError> {
        serde_json::to_string(self).map_err(|e| StageError::Other(format!("offset encode: {e}")))
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.modified_ns, self.file.clone())
    }
}
