//! Post-install checks of the installed `mvim`.
//!
//! Three kinds of check, run in order:
//! - feature markers in `mvim --version` (e.g. `+ruby`)
//! - linkage: a runtime's install path must appear in the version output
//! - round trips: the embedded interpreter edits a buffer and the result is
//!   read back from disk

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::option::{BuildOption, ResolvedOptions};
use crate::util::diagnostic::Diagnostic;
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

/// Marker every build of this recipe reports.
pub const DEFAULT_MARKER: &str = "+ruby";

/// Script and file names used by round trips, relative to a scratch directory.
const SCRIPT_FILE: &str = "commands.vim";
const OUTPUT_FILE: &str = "test.txt";

/// An interpreter that can be driven through a scripted round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Python3,
    Ruby,
    Lua,
}

impl Interpreter {
    pub fn name(&self) -> &'static str {
        match self {
            Interpreter::Python3 => "python3",
            Interpreter::Ruby => "ruby",
            Interpreter::Lua => "lua",
        }
    }

    /// Text the round trip leaves on line 1.
    pub fn expected_text(&self) -> String {
        format!("hello {}", self.name())
    }

    /// Ex command that sets line 1 of the current buffer.
    fn command(&self) -> String {
        let text = self.expected_text();
        match self {
            Interpreter::Python3 => {
                format!(":python3 import vim; vim.current.buffer[0] = '{}'", text)
            }
            Interpreter::Ruby => format!(":ruby VIM::Buffer.current[1] = '{}'", text),
            Interpreter::Lua => format!(":lua vim.buffer()[1] = '{}'", text),
        }
    }

    /// Contents of `commands.vim`.
    pub fn script(&self) -> String {
        format!("{}\n:wq\n", self.command())
    }
}

/// A runtime whose install path must show up in `mvim --version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageCheck {
    pub runtime: &'static str,
    /// Expected path. When `None`, `query` is run to find it.
    pub expected: Option<String>,
    pub query: &'static [&'static str],
}

impl LinkageCheck {
    /// Python 3, located through `python3-config --exec-prefix`.
    pub fn python3(expected: Option<String>) -> Self {
        LinkageCheck {
            runtime: "python3",
            expected,
            query: &["python3-config", "--exec-prefix"],
        }
    }
}

/// What an installed binary is expected to provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub markers: Vec<String>,
    pub linkage: Vec<LinkageCheck>,
    pub round_trips: Vec<Interpreter>,
}

impl Default for Expectation {
    fn default() -> Self {
        Expectation {
            markers: vec![DEFAULT_MARKER.to_string()],
            linkage: Vec::new(),
            round_trips: Vec::new(),
        }
    }
}

impl Expectation {
    /// Checks implied by a resolved option set.
    pub fn for_options(options: &ResolvedOptions) -> Self {
        let mut expectation = Expectation::default();

        if options.is_enabled(BuildOption::Python) {
            expectation.linkage.push(LinkageCheck::python3(None));
            expectation.round_trips.push(Interpreter::Python3);
        }
        if options.is_enabled(BuildOption::Ruby) {
            expectation.round_trips.push(Interpreter::Ruby);
        }
        if options.is_enabled(BuildOption::Lua) {
            expectation.markers.push("+lua".to_string());
            expectation.round_trips.push(Interpreter::Lua);
        }
        expectation
    }
}

/// Why an installed binary failed verification.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum VerifyError {
    #[error("failed to run `{command}`: {reason}")]
    #[diagnostic(code(mvim_recipe::verify::spawn))]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with {code:?}")]
    #[diagnostic(code(mvim_recipe::verify::exit))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("version output lacks `{marker}`")]
    #[diagnostic(code(mvim_recipe::verify::marker))]
    MissingMarker { marker: String },

    #[error("binary is not linked against {runtime} at {expected}")]
    #[diagnostic(code(mvim_recipe::verify::linkage))]
    LinkageMismatch { runtime: String, expected: String },

    #[error("{interpreter} round trip wrote {actual:?}, expected {expected:?}")]
    #[diagnostic(code(mvim_recipe::verify::round_trip))]
    RoundTrip {
        interpreter: String,
        expected: String,
        actual: String,
    },

    #[error("scratch file error at {}: {reason}", .path.display())]
    #[diagnostic(code(mvim_recipe::verify::scratch))]
    Scratch { path: PathBuf, reason: String },
}

impl VerifyError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            VerifyError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
                diag.with_context(stderr.trim().to_string())
            }
            VerifyError::MissingMarker { .. } => {
                diag.with_suggestion("Check the `configure` arguments with `mvim-recipe plan`")
            }
            VerifyError::LinkageMismatch { runtime, .. } => diag.with_suggestion(format!(
                "Rebuild after making sure `{}` is the interpreter configure finds first",
                runtime
            )),
            VerifyError::Scratch { path, .. } => diag.with_location(path),
            _ => diag,
        }
    }
}

/// Run every check, returning the first failure.
pub fn check<R: CommandRunner + ?Sized>(
    binary: &Path,
    expectation: &Expectation,
    runner: &R,
) -> Result<(), VerifyError> {
    let version = run_checked(runner, &ProcessBuilder::new(binary).arg("--version"))?;
    let output = format!("{}{}", version.stdout, version.stderr);

    for marker in &expectation.markers {
        if !has_marker(&output, marker) {
            return Err(VerifyError::MissingMarker {
                marker: marker.clone(),
            });
        }
        tracing::debug!("found marker {}", marker);
    }

    for linkage in &expectation.linkage {
        check_linkage(&output, linkage, runner)?;
    }

    for interpreter in &expectation.round_trips {
        round_trip(binary, *interpreter, runner)?;
    }

    Ok(())
}

/// Whether `marker` appears as a whole feature token, e.g. `+python3` in
/// `+python3/dyn` but `+lua` not in `+luajit`.
pub fn has_marker(version_output: &str, marker: &str) -> bool {
    let pattern = format!(r"(?:^|\s){}(?:/dyn)?(?:\s|$)", regex::escape(marker));
    regex::Regex::new(&pattern)
        .map(|re| re.is_match(version_output))
        .unwrap_or(false)
}

/// Run every check, logging the failure if there is one.
pub fn verify<R: CommandRunner + ?Sized>(
    binary: &Path,
    expectation: &Expectation,
    runner: &R,
) -> bool {
    match check(binary, expectation, runner) {
        Ok(()) => {
            tracing::info!("{} passed verification", binary.display());
            true
        }
        Err(e) => {
            tracing::warn!("{} failed verification: {}", binary.display(), e);
            false
        }
    }
}

fn check_linkage<R: CommandRunner + ?Sized>(
    version_output: &str,
    linkage: &LinkageCheck,
    runner: &R,
) -> Result<(), VerifyError> {
    let expected = match &linkage.expected {
        Some(path) => path.clone(),
        None => {
            let (program, args) = linkage
                .query
                .split_first()
                .ok_or_else(|| VerifyError::Spawn {
                    command: linkage.runtime.to_string(),
                    reason: "no query command configured".to_string(),
                })?;
            let out = run_checked(runner, &ProcessBuilder::new(program).args(args.iter()))?;
            out.stdout.trim_end().to_string()
        }
    };

    if expected.is_empty() || !version_output.contains(&expected) {
        return Err(VerifyError::LinkageMismatch {
            runtime: linkage.runtime.to_string(),
            expected,
        });
    }
    tracing::debug!("{} linked from {}", linkage.runtime, expected);
    Ok(())
}

fn round_trip<R: CommandRunner + ?Sized>(
    binary: &Path,
    interpreter: Interpreter,
    runner: &R,
) -> Result<(), VerifyError> {
    let _span = tracing::debug_span!("round_trip", interpreter = interpreter.name()).entered();

    let scratch = tempfile::TempDir::new().map_err(|e| VerifyError::Scratch {
        path: std::env::temp_dir(),
        reason: e.to_string(),
    })?;
    let script = scratch.path().join(SCRIPT_FILE);
    std::fs::write(&script, interpreter.script()).map_err(|e| VerifyError::Scratch {
        path: script.clone(),
        reason: e.to_string(),
    })?;

    let cmd = ProcessBuilder::new(binary)
        .args(["-v", "-T", "dumb", "-s", SCRIPT_FILE, OUTPUT_FILE])
        .cwd(scratch.path());
    // vim's exit status is not meaningful here; the file contents are.
    runner.run(&cmd).map_err(|e| VerifyError::Spawn {
        command: cmd.display_command(),
        reason: format!("{:#}", e),
    })?;

    let output = scratch.path().join(OUTPUT_FILE);
    let actual = std::fs::read_to_string(&output).unwrap_or_default();
    let actual = actual.trim_end_matches(['\r', '\n']).to_string();
    let expected = interpreter.expected_text();

    if actual != expected {
        return Err(VerifyError::RoundTrip {
            interpreter: interpreter.name().to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    cmd: &ProcessBuilder,
) -> Result<ProcessOutput, VerifyError> {
    let command = cmd.display_command();
    let output = runner.run(cmd).map_err(|e| VerifyError::Spawn {
        command: command.clone(),
        reason: format!("{:#}", e),
    })?;

    if !output.success() {
        return Err(VerifyError::CommandFailed {
            command,
            code: output.code,
            stderr: output.stderr,
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::resolve;
    use crate::test_support::{sierra_env, MockExecutor, MockProcessOutput};

    const PY_PREFIX: &str = "/usr/local/opt/python3/Frameworks/Python.framework/Versions/3.6";

    fn version_text() -> String {
        format!(
            "VIM - Vi IMproved 8.0 (2016 Sep 12)\n\
             Huge version with MacVim GUI.\n\
             +cscope +lua +multi_byte +python3/dyn +ruby -tcl\n\
             Linking: clang -L{}/lib/python3.6/config-3.6m-darwin\n",
            PY_PREFIX
        )
    }

    fn mock_mvim() -> MockExecutor {
        let mut exec = MockExecutor::new();
        exec.expect("/keg/bin/mvim --version", MockProcessOutput::success(version_text()))
            .expect(
                "python3-config --exec-prefix",
                MockProcessOutput::success(format!("{}\n", PY_PREFIX)),
            );
        exec
    }

    #[test]
    fn test_default_expectation() {
        let exec = mock_mvim();
        assert!(verify(Path::new("/keg/bin/mvim"), &Expectation::default(), &exec));
        assert_eq!(exec.calls(), vec!["/keg/bin/mvim --version"]);
    }

    #[test]
    fn test_missing_marker() {
        let exec = mock_mvim();
        let expectation = Expectation {
            markers: vec!["+ruby".into(), "+perl".into()],
            ..Expectation::default()
        };

        let err = check(Path::new("/keg/bin/mvim"), &expectation, &exec).unwrap_err();
        assert!(matches!(err, VerifyError::MissingMarker { ref marker } if marker == "+perl"));
    }

    #[test]
    fn test_linkage_queries_python_config() {
        let exec = mock_mvim();
        let expectation = Expectation {
            linkage: vec![LinkageCheck::python3(None)],
            ..Expectation::default()
        };

        check(Path::new("/keg/bin/mvim"), &expectation, &exec).unwrap();
        assert_eq!(exec.calls()[1], "python3-config --exec-prefix");
    }

    #[test]
    fn test_linkage_mismatch() {
        let exec = mock_mvim();
        let expectation = Expectation {
            linkage: vec![LinkageCheck::python3(Some(
                "/System/Library/Frameworks/Python.framework".into(),
            ))],
            ..Expectation::default()
        };

        let err = check(Path::new("/keg/bin/mvim"), &expectation, &exec).unwrap_err();
        assert!(matches!(err, VerifyError::LinkageMismatch { .. }));
        // supplied path, no query
        assert_eq!(exec.calls().len(), 1);
    }

    #[test]
    fn test_version_failure() {
        let mut exec = MockExecutor::new();
        exec.set_default(MockProcessOutput::failure(127, "dyld: Library not loaded"));

        let err = check(Path::new("/keg/bin/mvim"), &Expectation::default(), &exec).unwrap_err();
        match &err {
            VerifyError::CommandFailed { code, .. } => assert_eq!(*code, Some(127)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_diagnostic().format(false).contains("dyld"));
    }

    #[test]
    fn test_for_options() {
        let env = sierra_env();
        let expectation = Expectation::for_options(&resolve(&["with-lua"], &env).unwrap());
        assert_eq!(expectation.markers, vec!["+ruby", "+lua"]);
        assert_eq!(expectation.linkage, vec![LinkageCheck::python3(None)]);
        assert_eq!(
            expectation.round_trips,
            vec![Interpreter::Python3, Interpreter::Ruby, Interpreter::Lua]
        );

        let expectation =
            Expectation::for_options(&resolve(&["without-python", "without-ruby"], &env).unwrap());
        assert_eq!(expectation, Expectation::default());
    }

    #[test]
    fn test_marker_tokens() {
        let text = version_text();
        assert!(has_marker(&text, "+ruby"));
        assert!(has_marker(&text, "+python3"));
        assert!(has_marker(&text, "-tcl"));
        assert!(!has_marker(&text, "+rub"));
        assert!(!has_marker(&text, "+perl"));
    }

    #[test]
    fn test_scripts() {
        assert_eq!(
            Interpreter::Python3.script(),
            ":python3 import vim; vim.current.buffer[0] = 'hello python3'\n:wq\n"
        );
        assert!(Interpreter::Ruby.script().contains("VIM::Buffer.current[1] = 'hello ruby'"));
        assert!(Interpreter::Lua.script().starts_with(":lua "));
    }

    #[cfg(unix)]
    #[test]
    fn test_round_trip_with_fake_binary() {
        use crate::test_support::write_fake_mvim;
        use crate::util::process::SystemRunner;

        let tmp = tempfile::TempDir::new().unwrap();
        let mvim = write_fake_mvim(tmp.path(), &version_text()).unwrap();

        let expectation = Expectation {
            markers: vec!["+ruby".into(), "+lua".into()],
            linkage: vec![LinkageCheck::python3(Some(PY_PREFIX.into()))],
            round_trips: vec![Interpreter::Python3, Interpreter::Ruby, Interpreter::Lua],
        };
        check(&mvim, &expectation, &SystemRunner).unwrap();
    }

    #[test]
    fn test_round_trip_without_output_fails() {
        // the mock runs nothing, so test.txt is never written
        let mut exec = mock_mvim();
        exec.set_default(MockProcessOutput::success(""));

        let expectation = Expectation {
            round_trips: vec![Interpreter::Ruby],
            ..Expectation::default()
        };
        let err = check(Path::new("/keg/bin/mvim"), &expectation, &exec).unwrap_err();
        match err {
            VerifyError::RoundTrip { interpreter, actual, .. } => {
                assert_eq!(interpreter, "ruby");
                assert!(actual.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
