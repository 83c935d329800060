//! mvim-recipe - a build recipe for MacVim
//!
//! This crate provides the library behind the `mvim-recipe` binary: option
//! resolution, build planning, the external `configure`/`make` driver,
//! installation, and verification of the installed editor.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for mvim-recipe unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for filesystem and
/// process execution.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildPlan, ConfigureBuild};
pub use crate::core::{
    environment::EnvironmentFacts, option::ResolvedOptions, recipe::MACVIM, BuildOption,
};
pub use ops::{install_recipe, InstallRequest};
pub use util::context::GlobalContext;
