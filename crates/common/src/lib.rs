//! Shared helpers used by every crate in the workspace: logging setup,
//! runtime directory checks and small wire types.

pub mod types;
pub mod utils;
pub mod env;
