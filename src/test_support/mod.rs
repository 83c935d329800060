//! Test utilities and mocks for mvim-recipe unit tests.
//!
//! This module provides mock implementations for the two seams the recipe
//! talks to the outside world through: the filesystem the installer writes
//! to, and the process runner used for `configure`, `make`, and verification.
//!
//! # Example
//!
//! ```rust,ignore
//! use mvim_recipe::test_support::{MockExecutor, MockFileSystem, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let fs = MockFileSystem::new();
//!     fs.add_file("/src/configure", "#!/bin/sh");
//!
//!     let mut exec = MockExecutor::new();
//!     exec.expect_prefix("./configure", MockProcessOutput::success(""));
//!
//!     // Use mocks in tests...
//! }
//! ```

pub mod fixtures;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::ops::install::Filesystem;
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

// Re-export fixtures for convenience
pub use fixtures::*;

#[derive(Debug, Default)]
struct FsState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    links: BTreeMap<PathBuf, PathBuf>,
}

impl FsState {
    fn add_dir(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn present(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path) || self.links.contains_key(path)
    }
}

/// In-memory filesystem for installer tests.
///
/// Symlinks are recorded, not followed: a link counts as present even when
/// its target does not exist, matching `symlink_metadata` on a real host.
#[derive(Debug, Default)]
pub struct MockFileSystem {
    state: Mutex<FsState>,
}

impl MockFileSystem {
    /// Create a new empty mock filesystem.
    pub fn new() -> Self {
        MockFileSystem::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FsState> {
        self.state.lock().unwrap()
    }

    /// Add a file with the given content, creating parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            state.add_dir(parent);
        }
        state.files.insert(path.to_path_buf(), content.into());
    }

    /// Add a directory and all its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.state().add_dir(path.as_ref());
    }

    /// Add a symlink without checking its target.
    pub fn add_link(&self, target: impl AsRef<Path>, link: impl AsRef<Path>) {
        let link = link.as_ref();
        let mut state = self.state();
        if let Some(parent) = link.parent() {
            state.add_dir(parent);
        }
        state
            .links
            .insert(link.to_path_buf(), target.as_ref().to_path_buf());
    }

    /// Check if a path is a file.
    pub fn is_file(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    /// Read a file's contents.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("file not found: {}", path.display()))
    }

    /// Target of a recorded symlink.
    pub fn read_link(&self, path: &Path) -> Option<PathBuf> {
        self.state().links.get(path).cloned()
    }

    /// All recorded symlinks, keyed by link path.
    pub fn links(&self) -> BTreeMap<PathBuf, PathBuf> {
        self.state().links.clone()
    }
}

impl Filesystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.state().present(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state().dirs.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state();
        if state.files.contains_key(path) || state.links.contains_key(path) {
            bail!("not a directory: {}", path.display());
        }
        state.add_dir(path);
        Ok(())
    }

    fn copy_dir(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut state = self.state();
        if !state.dirs.contains(src) {
            bail!("directory not found: {}", src.display());
        }

        let rebase = |p: &Path| p.strip_prefix(src).ok().map(|rel| dst.join(rel));

        let dirs: Vec<PathBuf> = state.dirs.iter().filter_map(|d| rebase(d)).collect();
        let files: Vec<(PathBuf, Vec<u8>)> = state
            .files
            .iter()
            .filter_map(|(p, c)| rebase(p).map(|p| (p, c.clone())))
            .collect();
        let links: Vec<(PathBuf, PathBuf)> = state
            .links
            .iter()
            .filter_map(|(l, t)| rebase(l).map(|l| (l, t.clone())))
            .collect();

        for dir in dirs {
            state.add_dir(&dir);
        }
        state.files.extend(files);
        state.links.extend(links);
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let mut state = self.state();
        if state.present(link) {
            bail!("file exists: {}", link.display());
        }
        match link.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !state.dirs.contains(parent) => {
                bail!("no such directory: {}", parent.display())
            }
            _ => {}
        }
        state.links.insert(link.to_path_buf(), target.to_path_buf());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut state = self.state();
        if !state.present(path) {
            bail!("not found: {}", path.display());
        }
        if state.links.remove(path).is_some() || state.files.remove(path).is_some() {
            return Ok(());
        }
        state.files.retain(|p, _| !p.starts_with(path));
        state.links.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|d| !d.starts_with(path));
        Ok(())
    }
}

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn to_output(&self) -> ProcessOutput {
        ProcessOutput {
            code: Some(self.status),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
struct CommandExpectation {
    pattern: CommandPattern,
    output: MockProcessOutput,
}

/// Mock command runner.
///
/// Commands are matched against expectations in the order they were added;
/// every command run is recorded, including its environment and working
/// directory, so tests can check what a child would have seen.
#[derive(Debug, Default)]
pub struct MockExecutor {
    expectations: Vec<CommandExpectation>,
    calls: Mutex<Vec<ProcessBuilder>>,
    default_output: Option<MockProcessOutput>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&mut self, cmd: &str, output: MockProcessOutput) -> &mut Self {
        self.expect_pattern(CommandPattern::Exact(cmd.to_string()), output)
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&mut self, prefix: &str, output: MockProcessOutput) -> &mut Self {
        self.expect_pattern(CommandPattern::StartsWith(prefix.to_string()), output)
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&mut self, substring: &str, output: MockProcessOutput) -> &mut Self {
        self.expect_pattern(CommandPattern::Contains(substring.to_string()), output)
    }

    pub fn expect_pattern(&mut self, pattern: CommandPattern, output: MockProcessOutput) -> &mut Self {
        self.expectations.push(CommandExpectation { pattern, output });
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&mut self, output: MockProcessOutput) -> &mut Self {
        self.default_output = Some(output);
        self
    }

    /// Display strings of all commands run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    /// Full commands run so far, in order.
    pub fn recorded(&self) -> Vec<ProcessBuilder> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockExecutor {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let full_cmd = cmd.display_command();
        self.calls.lock().unwrap().push(cmd.clone());

        if let Some(exp) = self
            .expectations
            .iter()
            .find(|e| e.pattern.matches(&full_cmd))
        {
            return Ok(exp.output.to_output());
        }

        if let Some(ref default) = self.default_output {
            return Ok(default.to_output());
        }

        bail!("unexpected command: {}", full_cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_copy_preserves_links() {
        let fs = MockFileSystem::new();
        fs.add_file("/src/App/Contents/bin/mvim", "#!/bin/sh");
        fs.add_link("Versions/A", "/src/App/Framework/Current");

        fs.copy_dir(Path::new("/src/App"), Path::new("/dst/App")).unwrap();

        assert!(fs.is_file(Path::new("/dst/App/Contents/bin/mvim")));
        assert_eq!(
            fs.read_link(Path::new("/dst/App/Framework/Current")),
            Some(PathBuf::from("Versions/A"))
        );
    }

    #[test]
    fn test_mock_fs_symlink_requires_parent() {
        let fs = MockFileSystem::new();
        assert!(fs.symlink(Path::new("mvim"), Path::new("/keg/bin/vi")).is_err());

        fs.create_dir_all(Path::new("/keg/bin")).unwrap();
        fs.symlink(Path::new("mvim"), Path::new("/keg/bin/vi")).unwrap();
        assert!(fs.exists(Path::new("/keg/bin/vi")));
        assert!(fs.symlink(Path::new("mvim"), Path::new("/keg/bin/vi")).is_err());
    }

    #[test]
    fn test_mock_fs_remove_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("/keg/MacVim.app/Contents/Info.plist", "plist");

        fs.remove(Path::new("/keg/MacVim.app")).unwrap();
        assert!(!fs.exists(Path::new("/keg/MacVim.app/Contents/Info.plist")));
        assert!(fs.is_dir(Path::new("/keg")));
    }

    #[test]
    fn test_mock_executor_matches_in_order() {
        let mut exec = MockExecutor::new();
        exec.expect("make", MockProcessOutput::failure(2, "boom"))
            .expect_prefix("./configure", MockProcessOutput::success("ok"));

        let out = exec
            .run(&ProcessBuilder::new("./configure").arg("--enable-multibyte"))
            .unwrap();
        assert!(out.success());

        let out = exec.run(&ProcessBuilder::new("make")).unwrap();
        assert_eq!(out.code, Some(2));

        assert!(exec.run(&ProcessBuilder::new("xcodebuild")).is_err());
        assert_eq!(
            exec.calls(),
            vec!["./configure --enable-multibyte", "make", "xcodebuild"]
        );
    }

    #[test]
    fn test_command_pattern_regex() {
        let pattern = CommandPattern::Regex(r"^python3-config --exec-prefix$".to_string());
        assert!(pattern.matches("python3-config --exec-prefix"));
        assert!(!pattern.matches("python3-config --prefix"));
    }
}
