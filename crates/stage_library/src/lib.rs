//! # Stage Library
//!
//! Explicit, centrally-owned stage plugin registry.
//!
//! Responsibilities:
//! - Map a `(library, stage_name)` pair to a factory producing a [`StageInstance`]
//! - Reject duplicate registrations
//! - Wire every stage shipped with the agent ([`builtin_registry`])
//!
//! The registry is built once during startup and shared by handle; there is
//! no global mutable registration table.

mod builtin;
pub mod error;
mod registry;

pub use builtin::builtin_registry;
pub use contracts::{StageInstance, StageKind};
pub use error::{RegistryError, Result};
pub use registry::{StageFactory, StageKey, StageRegistry};
