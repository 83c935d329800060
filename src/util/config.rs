//! Configuration file support for mvim-recipe.
//!
//! Two configuration file locations are read:
//! - Global: `~/.mvim-recipe/config.toml` - User-wide defaults
//! - Project: `.mvim-recipe/config.toml` - Overrides for one source checkout
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::environment::MacOsVersion;

/// Directory name used for both config locations.
pub const CONFIG_DIR: &str = ".mvim-recipe";

/// File name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// mvim-recipe configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host facts that detection would otherwise supply
    pub environment: EnvironmentConfig,

    /// Option requests applied to every build
    pub options: OptionsConfig,

    /// Installed dependency locations, keyed by name
    pub dependencies: BTreeMap<String, PathBuf>,
}

/// `[environment]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// macOS release, symbolic (`sierra`) or numeric (`10.12`)
    pub os_version: Option<String>,

    /// Architecture passed to `--with-macarchs`
    pub arch: Option<String>,

    /// Shared host prefix
    pub prefix: Option<PathBuf>,

    /// Installation prefix for MacVim itself
    pub keg: Option<PathBuf>,
}

/// `[options]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Flags requested before any given on the command line
    pub default: Vec<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let env = other.environment;
        if env.os_version.is_some() {
            self.environment.os_version = env.os_version;
        }
        if env.arch.is_some() {
            self.environment.arch = env.arch;
        }
        if env.prefix.is_some() {
            self.environment.prefix = env.prefix;
        }
        if env.keg.is_some() {
            self.environment.keg = env.keg;
        }

        if !other.options.default.is_empty() {
            self.options.default = other.options.default;
        }

        // Per-name: a project entry replaces the global one
        self.dependencies.extend(other.dependencies);
    }

    /// Parsed `environment.os_version`.
    pub fn os_version(&self) -> Result<Option<MacOsVersion>> {
        self.environment
            .os_version
            .as_deref()
            .map(|s| {
                s.parse::<MacOsVersion>()
                    .map_err(|e| anyhow::anyhow!(e))
                    .context("invalid environment.os_version in config")
            })
            .transpose()
    }
}

/// Load configuration from global and project paths, merging them.
///
/// Project config takes precedence over global config.
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    // Project config overrides global
    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (`~/.mvim-recipe`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Get the project config file path for a directory.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}
