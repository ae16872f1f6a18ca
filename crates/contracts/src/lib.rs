//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the edge agent:
//! records and batches, pipeline definitions and lifecycle state, and the
//! capability traits implemented by stage plugins.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data flow
//! - An [`Origin`] fills a [`BatchMaker`] and returns an opaque offset string
//! - Each [`Processor`] turns one [`Batch`] into the next
//! - A [`Destination`] consumes the final [`Batch`]
//! - Records that fail conversion are routed to an [`ErrorSink`] instead of
//!   aborting the batch

mod batch;
mod definition;
mod error;
mod execution_config;
mod parameters;
mod record;
mod stage;
mod state;

pub use batch::*;
pub use definition::*;
pub use error::*;
pub use execution_config::*;
pub use parameters::*;
pub use record::*;
pub use stage::*;
pub use state::*;
