//! High-level operations.
//!
//! This module contains the implementation of mvim-recipe commands.

pub mod install;
pub mod recipe_install;
pub mod verify;

pub use install::{Filesystem, HostFilesystem, InstallError, Installer};
pub use recipe_install::{install_recipe, InstallReport, InstallRequest};
pub use verify::{check, verify, Expectation, Interpreter, LinkageCheck, VerifyError};
