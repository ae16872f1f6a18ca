//! Command implementations.

mod info;
mod reset_offset;
mod run;
mod status;
mod validate;

pub use info::run_info;
pub use reset_offset::run_reset_offset;
pub use run::run_agent;
pub use status::run_status;
pub use validate::run_validate;
