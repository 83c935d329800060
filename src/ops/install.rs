//! Execution of a plan's post-install actions.
//!
//! The installer copies the built bundle into the keg and lays down the
//! command symlinks. It runs every action in plan order and stops at the
//! first failure.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::builder::plan::{Action, BuildPlan};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::fs as host_fs;

/// Filesystem primitives the installer needs.
pub trait Filesystem {
    /// Whether anything, including a dangling symlink, exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy a directory tree, recreating symlinks instead of following them.
    fn copy_dir(&self, src: &Path, dst: &Path) -> Result<()>;

    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Remove a file, symlink, or directory tree.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFilesystem;

impl Filesystem for HostFilesystem {
    fn exists(&self, path: &Path) -> bool {
        host_fs::path_present(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        host_fs::ensure_dir(path)
    }

    fn copy_dir(&self, src: &Path, dst: &Path) -> Result<()> {
        host_fs::copy_dir_all(src, dst)
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        Ok(host_fs::symlink(target, link)?)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        host_fs::remove_path_if_exists(path)
    }
}

/// Failure while executing a post-install action.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum InstallError {
    #[error("build output not found at {}", .path.display())]
    #[diagnostic(
        code(mvim_recipe::install::source_missing),
        help("check that `make` produced src/MacVim/build/Release/MacVim.app")
    )]
    SourceMissing { path: PathBuf },

    #[error("cannot link {}: target {} does not exist", .link.display(), .target.display())]
    #[diagnostic(code(mvim_recipe::install::target_missing))]
    TargetMissing { link: PathBuf, target: PathBuf },

    #[error("failed to {operation} {}: {reason}", .path.display())]
    #[diagnostic(code(mvim_recipe::install::io))]
    Io {
        operation: &'static str,
        path: PathBuf,
        reason: String,
    },
}

impl InstallError {
    fn io(operation: &'static str, path: &Path, err: anyhow::Error) -> Self {
        InstallError::Io {
            operation,
            path: path.to_path_buf(),
            reason: format!("{:#}", err),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            InstallError::SourceMissing { path } => {
                Diagnostic::error("build output not found")
                    .with_location(path)
                    .with_suggestion(suggestions::INSTALL_LAYOUT)
            }
            InstallError::TargetMissing { link, target } => Diagnostic::error(format!(
                "cannot link {}",
                link.display()
            ))
            .with_context(format!("target {} does not exist", target.display()))
            .with_suggestion("Earlier install actions must create the link target"),
            InstallError::Io { operation, path, reason } => {
                Diagnostic::error(format!("failed to {} {}", operation, path.display()))
                    .with_context(reason.clone())
            }
        }
    }
}

/// Where a symlink's target lives, with relative targets resolved against
/// the link's directory.
pub fn resolve_link_target(target: &Path, link: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match link.parent() {
        Some(dir) => dir.join(target),
        None => target.to_path_buf(),
    }
}

/// The target as written into the link: relative to the link's directory.
pub fn relative_link_target(target: &Path, link: &Path) -> PathBuf {
    match (target.is_absolute(), link.parent()) {
        (true, Some(dir)) => host_fs::relative_path(dir, target),
        _ => target.to_path_buf(),
    }
}

/// Executes post-install actions against a [`Filesystem`].
pub struct Installer<'a, F: Filesystem + ?Sized> {
    source_dir: PathBuf,
    fs: &'a F,
}

impl<'a, F: Filesystem + ?Sized> Installer<'a, F> {
    /// `source_dir` anchors the relative sources of `InstallDirectory`.
    pub fn new(source_dir: impl Into<PathBuf>, fs: &'a F) -> Self {
        Installer {
            source_dir: source_dir.into(),
            fs,
        }
    }

    /// Run every action of the plan, in order.
    pub fn install(&self, plan: BuildPlan) -> Result<(), InstallError> {
        let actions = plan.into_actions();
        tracing::debug!("installing {} actions", actions.len());

        for action in &actions {
            self.apply(action)?;
        }
        Ok(())
    }

    pub fn apply(&self, action: &Action) -> Result<(), InstallError> {
        match action {
            Action::InstallDirectory { src, dest } => self.install_directory(src, dest),
            Action::CreateSymlink { target, link } => self.create_symlink(target, link),
        }
    }

    fn install_directory(&self, src: &Path, dest: &Path) -> Result<(), InstallError> {
        let src = self.source_dir.join(src);
        if !self.fs.is_dir(&src) {
            return Err(InstallError::SourceMissing { path: src });
        }

        if self.fs.exists(dest) {
            tracing::debug!("replacing {}", dest.display());
            self.fs
                .remove(dest)
                .map_err(|e| InstallError::io("remove", dest, e))?;
        }
        if let Some(parent) = dest.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| InstallError::io("create", parent, e))?;
        }

        tracing::debug!("copying {} to {}", src.display(), dest.display());
        self.fs
            .copy_dir(&src, dest)
            .map_err(|e| InstallError::io("copy", dest, e))
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> Result<(), InstallError> {
        let resolved = resolve_link_target(target, link);
        if !self.fs.exists(&resolved) {
            return Err(InstallError::TargetMissing {
                link: link.to_path_buf(),
                target: resolved,
            });
        }

        if self.fs.exists(link) {
            self.fs
                .remove(link)
                .map_err(|e| InstallError::io("remove", link, e))?;
        }
        if let Some(parent) = link.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| InstallError::io("create", parent, e))?;
        }

        let written = relative_link_target(target, link);
        tracing::debug!("linking {} -> {}", link.display(), written.display());
        self.fs
            .symlink(&written, link)
            .map_err(|e| InstallError::io("link", link, e))
    }
}
