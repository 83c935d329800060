//! Test fixtures for common test scenarios.
//!
//! Host facts for the releases the recipe special-cases, and on-disk
//! layouts that look like a finished MacVim build.

use std::fs;
use std::path::{Path, PathBuf};

use super::MockFileSystem;
use crate::builder::plan::BUILD_OUTPUT;
use crate::core::environment::{EnvironmentFacts, MacOsVersion};

/// An Intel Sierra host with the conventional `/usr/local` prefix.
pub fn sierra_env() -> EnvironmentFacts {
    env_for(MacOsVersion::Sierra)
}

/// An Intel host on the given release with the `/usr/local` prefix.
pub fn env_for(os: MacOsVersion) -> EnvironmentFacts {
    EnvironmentFacts::new(os, "x86_64", "/usr/local")
}

/// Files a finished build leaves inside the app bundle, relative to it.
pub const BUNDLE_FILES: &[(&str, &str)] = &[
    ("Contents/Info.plist", "<plist/>"),
    ("Contents/MacOS/MacVim", "binary"),
    ("Contents/MacOS/Vim", "binary"),
    ("Contents/bin/mvim", "#!/bin/sh\nexec Vim -g \"$@\"\n"),
];

/// Write a fake build result under `source_dir` on the real filesystem.
///
/// Returns the bundle path.
pub fn write_fake_build(source_dir: &Path) -> std::io::Result<PathBuf> {
    let bundle = source_dir.join(BUILD_OUTPUT);
    for (rel, content) in BUNDLE_FILES {
        let path = bundle.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(bundle)
}

/// Populate a mock filesystem with a fake build result under `source_dir`.
pub fn mock_fake_build(fs: &MockFileSystem, source_dir: &Path) -> PathBuf {
    let bundle = source_dir.join(BUILD_OUTPUT);
    for (rel, content) in BUNDLE_FILES {
        fs.add_file(bundle.join(rel), *content);
    }
    bundle
}

/// Shell script standing in for an installed `mvim`.
///
/// `--version` prints `version_output`. Invoked as
/// `mvim -v -T dumb -s <script> <file>`, it writes the quoted text from the
/// first assignment in the script to the file, which is what a working
/// interpreter round trip produces.
#[cfg(unix)]
pub fn write_fake_mvim(dir: &Path, version_output: &str) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
cat <<'EOF'
{version_output}
EOF
exit 0
fi
sed -n "s/.*= '\(.*\)'.*/\1/p" "$5" | head -n 1 > "$6"
"#
    );

    let path = dir.join("mvim");
    fs::write(&path, script)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::install::Filesystem;

    #[test]
    fn test_env_fixtures() {
        let env = sierra_env();
        assert_eq!(env.os_version, MacOsVersion::Sierra);
        assert_eq!(env.preferred_arch, "x86_64");
        assert_eq!(env.prefix, PathBuf::from("/usr/local"));

        assert_eq!(env_for(MacOsVersion::Mojave).os_version, MacOsVersion::Mojave);
    }

    #[test]
    fn test_write_fake_build() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bundle = write_fake_build(tmp.path()).unwrap();
        assert!(bundle.join("Contents/bin/mvim").is_file());
    }

    #[test]
    fn test_mock_fake_build() {
        let fs = MockFileSystem::new();
        let bundle = mock_fake_build(&fs, Path::new("/src/macvim"));
        assert!(fs.is_dir(&bundle));
        assert!(fs.is_file(&bundle.join("Contents/Info.plist")));
    }
}
