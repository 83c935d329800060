//! Build planning and the external build.
//!
//! [`plan`] turns resolved options into a [`BuildPlan`]; [`configure`] runs
//! MacVim's own `configure` and `make` against it.

pub mod configure;
pub mod plan;

pub use configure::{BuildError, ConfigureBuild};
pub use plan::{Action, BuildPlan, EnvironmentOverride, PlanError};
