//! Global context for mvim-recipe operations.
//!
//! Provides centralized access to configuration, paths, and the terminal
//! shell, and assembles [`EnvironmentFacts`] from flags, config, and host
//! detection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::environment::{self, EnvironmentFacts, MacOsVersion};
use crate::util::config::{self, Config};
use crate::util::shell::Shell;

/// Host prefix used when neither flags nor config name one.
pub const DEFAULT_PREFIX: &str = "/usr/local";

/// Host facts given explicitly, typically on the command line.
///
/// Anything left `None` falls back to config, then detection.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOverrides {
    pub os_version: Option<MacOsVersion>,
    pub arch: Option<String>,
    pub prefix: Option<PathBuf>,
    pub keg: Option<PathBuf>,
    pub dependencies: Vec<(String, PathBuf)>,
}

/// Global context shared by every command.
#[derive(Debug)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Merged global + project configuration
    config: Config,

    shell: Shell,
}

impl GlobalContext {
    /// Create a context for the current directory, loading configuration.
    pub fn new(shell: Shell) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd, shell))
    }

    /// Create a context rooted at `cwd`.
    pub fn with_cwd(cwd: PathBuf, shell: Shell) -> Self {
        let global_config = config::global_config_path();
        let project_config = config::project_config_path(&cwd);

        let config = match &global_config {
            Some(global) => config::load_config(global, &project_config),
            None => Config::load_or_default(&project_config),
        };
        tracing::debug!(?global_config, project = %project_config.display(), "loaded config");

        GlobalContext {
            cwd,
            config,
            shell,
        }
    }

    /// Replace the loaded configuration.
    #[cfg(test)]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// `path` anchored at the working directory if it is relative.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Option requests from config followed by `requested`.
    pub fn option_requests(&self, requested: &[String]) -> Vec<String> {
        self.config
            .options
            .default
            .iter()
            .chain(requested)
            .cloned()
            .collect()
    }

    /// Assemble host facts: explicit overrides, then config, then detection.
    pub fn environment(&self, overrides: &EnvironmentOverrides) -> Result<EnvironmentFacts> {
        let cfg = &self.config.environment;

        let os_version = match overrides.os_version {
            Some(v) => v,
            None => match self.config.os_version()? {
                Some(v) => v,
                None => environment::detect_os_version()?,
            },
        };

        let arch = match overrides.arch.as_ref().or(cfg.arch.as_ref()) {
            Some(a) => a.clone(),
            None => environment::detect_arch()?,
        };

        let prefix = overrides
            .prefix
            .as_ref()
            .or(cfg.prefix.as_ref())
            .map(|p| self.absolute(p))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX));

        let mut env = EnvironmentFacts::new(os_version, arch, prefix);
        if let Some(keg) = overrides.keg.as_ref().or(cfg.keg.as_ref()) {
            env = env.with_keg(self.absolute(keg));
        }

        for (name, path) in self.config.dependencies.iter().chain(
            overrides.dependencies.iter().map(|(name, path)| (name, path)),
        ) {
            env = env.with_dependency(name, self.absolute(path));
        }

        tracing::debug!(
            os = %env.os_version,
            arch = %env.preferred_arch,
            keg = %env.keg.display(),
            "environment"
        );
        Ok(env)
    }
}
