//! Command implementations.

pub mod completions;
pub mod info;
pub mod install;
pub mod options;
pub mod plan;
pub mod verify;
