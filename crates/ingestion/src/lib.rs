//! # Ingestion
//!
//! Origin stages: the resumable directory spooler and the synthetic random
//! origin.
//!
//! ## Offsets
//! Every origin reports progress as an opaque string. The spooler's offset
//! names the open file, the byte position inside it and its ordering key, so
//! a restarted process resumes without re-reading committed lines.

pub mod dev_random;
pub mod spooler;

pub use dev_random::RandomSource;
pub use spooler::{ReadOrder, SpoolDirConfig, SpoolDirSource, SpoolOffset};
