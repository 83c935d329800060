//! Static package metadata for the MacVim recipe.
//!
//! The host package manager fetches and verifies the source archive; the recipe
//! only declares where it lives and what it should hash to.

use serde::Serialize;

use crate::core::environment::MacOsVersion;

/// A prebuilt bottle for one macOS release.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Bottle {
    pub os: MacOsVersion,
    pub sha256: &'static str,
}

/// Declared metadata of a recipe.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Recipe {
    pub name: &'static str,
    pub desc: &'static str,
    pub homepage: &'static str,
    pub url: &'static str,
    pub version: &'static str,
    pub sha256: &'static str,
    pub revision: u32,
    pub head: &'static str,
    pub bottles: &'static [Bottle],
}

/// The MacVim snapshot this crate builds.
pub const MACVIM: Recipe = Recipe {
    name: "macvim",
    desc: "GUI for vim, made for macOS",
    homepage: "https://github.com/macvim-dev/macvim",
    url: "https://github.com/macvim-dev/macvim/archive/snapshot-146.tar.gz",
    version: "8.0-146",
    sha256: "f13f2448ea17756d5d6f6a9e5cd1b933fa6f05c393d7848f35198b5b4a16105e",
    revision: 1,
    head: "https://github.com/macvim-dev/macvim.git",
    bottles: &[
        Bottle {
            os: MacOsVersion::HighSierra,
            sha256: "9150724774b95837fabbcd245e992119bd7c00d88c6a2b41a345c0471ed4b831",
        },
        Bottle {
            os: MacOsVersion::Sierra,
            sha256: "b8ff3db922ebc801bce4d998082c0cdfc76dc82bbcd55fcef840298bc1c4df97",
        },
        Bottle {
            os: MacOsVersion::ElCapitan,
            sha256: "c86706fc3141fdd2ed22188de2e49481c83b1fdb61c9c26f53fe5fdcd2b29638",
        },
    ],
};

impl Recipe {
    /// Version string including the recipe revision, e.g. `8.0-146_1`.
    pub fn version_with_revision(&self) -> String {
        if self.revision == 0 {
            self.version.to_string()
        } else {
            format!("{}_{}", self.version, self.revision)
        }
    }

    /// Bottle checksum for the given OS, if one was published.
    pub fn bottle_for(&self, os: MacOsVersion) -> Option<&Bottle> {
        self.bottles.iter().find(|b| b.os == os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_with_revision() {
        assert_eq!(MACVIM.version_with_revision(), "8.0-146_1");

        let unrevised = Recipe {
            revision: 0,
            ..MACVIM
        };
        assert_eq!(unrevised.version_with_revision(), "8.0-146");
    }

    #[test]
    fn test_bottle_lookup() {
        assert!(MACVIM.bottle_for(MacOsVersion::Sierra).is_some());
        assert!(MACVIM.bottle_for(MacOsVersion::Yosemite).is_none());
    }
}
