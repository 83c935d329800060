//! Host facts supplied to option resolution and plan construction.
//!
//! The host package manager normally provides these. When it does not, the
//! CLI fills gaps from configuration and finally from [`detect_os_version`] and
//! [`detect_arch`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::recipe::MACVIM;
use crate::util::process::ProcessBuilder;

/// macOS releases, ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacOsVersion {
    Leopard,
    SnowLeopard,
    Lion,
    MountainLion,
    Mavericks,
    Yosemite,
    ElCapitan,
    Sierra,
    HighSierra,
    Mojave,
    Catalina,
    BigSur,
    Monterey,
    Ventura,
    Sonoma,
    Sequoia,
}

impl MacOsVersion {
    const ALL: [MacOsVersion; 16] = [
        MacOsVersion::Leopard,
        MacOsVersion::SnowLeopard,
        MacOsVersion::Lion,
        MacOsVersion::MountainLion,
        MacOsVersion::Mavericks,
        MacOsVersion::Yosemite,
        MacOsVersion::ElCapitan,
        MacOsVersion::Sierra,
        MacOsVersion::HighSierra,
        MacOsVersion::Mojave,
        MacOsVersion::Catalina,
        MacOsVersion::BigSur,
        MacOsVersion::Monterey,
        MacOsVersion::Ventura,
        MacOsVersion::Sonoma,
        MacOsVersion::Sequoia,
    ];

    /// Symbolic name, e.g. `high_sierra`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MacOsVersion::Leopard => "leopard",
            MacOsVersion::SnowLeopard => "snow_leopard",
            MacOsVersion::Lion => "lion",
            MacOsVersion::MountainLion => "mountain_lion",
            MacOsVersion::Mavericks => "mavericks",
            MacOsVersion::Yosemite => "yosemite",
            MacOsVersion::ElCapitan => "el_capitan",
            MacOsVersion::Sierra => "sierra",
            MacOsVersion::HighSierra => "high_sierra",
            MacOsVersion::Mojave => "mojave",
            MacOsVersion::Catalina => "catalina",
            MacOsVersion::BigSur => "big_sur",
            MacOsVersion::Monterey => "monterey",
            MacOsVersion::Ventura => "ventura",
            MacOsVersion::Sonoma => "sonoma",
            MacOsVersion::Sequoia => "sequoia",
        }
    }

    /// Marketing version prefix, e.g. `10.13` or `14`.
    pub fn number(&self) -> &'static str {
        match self {
            MacOsVersion::Leopard => "10.5",
            MacOsVersion::SnowLeopard => "10.6",
            MacOsVersion::Lion => "10.7",
            MacOsVersion::MountainLion => "10.8",
            MacOsVersion::Mavericks => "10.9",
            MacOsVersion::Yosemite => "10.10",
            MacOsVersion::ElCapitan => "10.11",
            MacOsVersion::Sierra => "10.12",
            MacOsVersion::HighSierra => "10.13",
            MacOsVersion::Mojave => "10.14",
            MacOsVersion::Catalina => "10.15",
            MacOsVersion::BigSur => "11",
            MacOsVersion::Monterey => "12",
            MacOsVersion::Ventura => "13",
            MacOsVersion::Sonoma => "14",
            MacOsVersion::Sequoia => "15",
        }
    }

    fn from_number(s: &str) -> Option<Self> {
        let mut parts = s.split('.');
        let major = parts.next()?;
        // 10.x releases are keyed by minor; 11+ by major alone.
        let key = if major == "10" {
            format!("10.{}", parts.next()?)
        } else {
            major.to_string()
        };
        Self::ALL.iter().copied().find(|v| v.number() == key)
    }
}

impl fmt::Display for MacOsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MacOsVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            return Self::from_number(s)
                .ok_or_else(|| format!("unrecognized macOS version number '{}'", s));
        }

        let normalized = s.to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| format!("unrecognized macOS release '{}'", s))
    }
}

/// Facts about the host that the recipe cannot decide for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentFacts {
    /// Running macOS release.
    pub os_version: MacOsVersion,
    /// Architecture to build for (`x86_64`, `arm64`).
    pub preferred_arch: String,
    /// Shared host prefix, e.g. `/usr/local`.
    pub prefix: PathBuf,
    /// This package's own installation prefix.
    pub keg: PathBuf,
    /// Installed locations of resolved dependencies, keyed by name.
    pub dependency_locations: BTreeMap<String, PathBuf>,
}

impl EnvironmentFacts {
    /// Create facts with the default keg under `<prefix>/Cellar`.
    pub fn new(
        os_version: MacOsVersion,
        preferred_arch: impl Into<String>,
        prefix: impl Into<PathBuf>,
    ) -> Self {
        let prefix = prefix.into();
        let keg = default_keg(&prefix);
        EnvironmentFacts {
            os_version,
            preferred_arch: preferred_arch.into(),
            prefix,
            keg,
            dependency_locations: BTreeMap::new(),
        }
    }

    /// Override the installation prefix.
    pub fn with_keg(mut self, keg: impl Into<PathBuf>) -> Self {
        self.keg = keg.into();
        self
    }

    /// Record where a dependency is installed.
    pub fn with_dependency(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.dependency_locations.insert(name.into(), path.into());
        self
    }

    /// Installed location of a dependency.
    pub fn dependency_location(&self, name: &str) -> Option<&Path> {
        self.dependency_locations.get(name).map(PathBuf::as_path)
    }

    /// Directory that receives command symlinks.
    pub fn bin_dir(&self) -> PathBuf {
        self.keg.join("bin")
    }
}

/// Default keg for this recipe under a host prefix.
pub fn default_keg(prefix: &Path) -> PathBuf {
    prefix
        .join("Cellar")
        .join(MACVIM.name)
        .join(MACVIM.version_with_revision())
}

/// Read the macOS version via `sw_vers`.
pub fn detect_os_version() -> Result<MacOsVersion> {
    let Some(sw_vers) = crate::util::process::find_executable("sw_vers") else {
        bail!("`sw_vers` not found; pass --os-version or set environment.os_version in config");
    };

    let output = ProcessBuilder::new(sw_vers)
        .arg("-productVersion")
        .exec_and_check()?;
    let version = output.stdout.trim();

    version
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .with_context(|| format!("failed to interpret `sw_vers` output '{}'", version))
}

/// Read the machine architecture via `uname -m`.
pub fn detect_arch() -> Result<String> {
    let output = ProcessBuilder::new("uname").arg("-m").exec_and_check()?;
    let arch = output.stdout.trim().to_string();
    if arch.is_empty() {
        bail!("`uname -m` returned no architecture");
    }
    Ok(arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbolic_names() {
        assert_eq!("sierra".parse::<MacOsVersion>().unwrap(), MacOsVersion::Sierra);
        assert_eq!(
            "High Sierra".parse::<MacOsVersion>().unwrap(),
            MacOsVersion::HighSierra
        );
        assert_eq!(
            "el-capitan".parse::<MacOsVersion>().unwrap(),
            MacOsVersion::ElCapitan
        );
        assert!("tiger".parse::<MacOsVersion>().is_err());
    }

    #[test]
    fn test_parse_version_numbers() {
        assert_eq!("10.12.6".parse::<MacOsVersion>().unwrap(), MacOsVersion::Sierra);
        assert_eq!("10.10".parse::<MacOsVersion>().unwrap(), MacOsVersion::Yosemite);
        assert_eq!("14.2.1".parse::<MacOsVersion>().unwrap(), MacOsVersion::Sonoma);
        assert!("10.4".parse::<MacOsVersion>().is_err());
        assert!("10".parse::<MacOsVersion>().is_err());
    }

    #[test]
    fn test_versions_are_ordered() {
        assert!(MacOsVersion::Yosemite < MacOsVersion::Sierra);
        assert!(MacOsVersion::SnowLeopard < MacOsVersion::Lion);
        assert!(MacOsVersion::BigSur > MacOsVersion::Catalina);
    }

    #[test]
    fn test_default_keg() {
        let env = EnvironmentFacts::new(MacOsVersion::Sierra, "x86_64", "/usr/local");
        assert_eq!(env.keg, PathBuf::from("/usr/local/Cellar/macvim/8.0-146_1"));
        assert_eq!(env.bin_dir(), PathBuf::from("/usr/local/Cellar/macvim/8.0-146_1/bin"));
    }

    #[test]
    fn test_dependency_lookup() {
        let env = EnvironmentFacts::new(MacOsVersion::Sierra, "x86_64", "/usr/local")
            .with_dependency("lua", "/usr/local/opt/lua");
        assert_eq!(
            env.dependency_location("lua"),
            Some(Path::new("/usr/local/opt/lua"))
        );
        assert_eq!(env.dependency_location("ruby"), None);
    }
}
