//! Core data structures for mvim-recipe.
//!
//! This module contains the recipe's static description, its option model,
//! and the host facts everything else is computed from.

pub mod environment;
pub mod option;
pub mod recipe;

pub use environment::{EnvironmentFacts, MacOsVersion};
pub use option::{BuildOption, OptionKind, OptionRegistry, OptionSpec, ResolvedOptions};
pub use recipe::{Recipe, MACVIM};
