//! Driver for MacVim's autoconf build.
//!
//! Runs `./configure <args>` and then `make` in the source tree. Both children
//! receive the plan's environment overrides; the parent environment is left
//! alone.

use std::path::PathBuf;

use thiserror::Error;

use crate::builder::plan::BuildPlan;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::process::{find_make, CommandRunner, ProcessBuilder, ProcessOutput};

/// Failure of the external build.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum BuildError {
    #[error("`{command}` failed with exit code {}", display_code(.code))]
    #[diagnostic(
        code(mvim_recipe::build::failed),
        help("re-run with `--verbose` to see the full build output")
    )]
    ExternalBuildFailure {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to run `{command}`: {reason}")]
    #[diagnostic(code(mvim_recipe::build::spawn))]
    Spawn { command: String, reason: String },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Lines of captured output kept in a diagnostic.
const OUTPUT_TAIL: usize = 20;

impl BuildError {
    /// Diagnostic with the tail of the build output.
    pub fn to_diagnostic(&self) -> Diagnostic {
        self.to_diagnostic_with_output(false)
    }

    /// Diagnostic carrying either the tail of the failing step's output or,
    /// with `full_output`, everything it wrote to stdout and stderr.
    pub fn to_diagnostic_with_output(&self, full_output: bool) -> Diagnostic {
        match self {
            BuildError::ExternalBuildFailure {
                command,
                code,
                stdout,
                stderr,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "`{}` failed with exit code {}",
                    command,
                    display_code(code)
                ));
                if full_output {
                    for line in stdout.lines().chain(stderr.lines()) {
                        diag = diag.with_context(line);
                    }
                    return diag;
                }

                let output = if stderr.trim().is_empty() { stdout } else { stderr };
                for line in tail(output, OUTPUT_TAIL) {
                    diag = diag.with_context(line);
                }
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::Spawn { command, reason } => {
                Diagnostic::error(format!("failed to run `{}`", command)).with_context(reason)
            }
        }
    }
}

fn tail(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Configure-and-make builder for an unpacked MacVim source tree.
pub struct ConfigureBuild<'a, R: CommandRunner + ?Sized> {
    source_dir: PathBuf,
    runner: &'a R,
    make: PathBuf,
}

impl<'a, R: CommandRunner + ?Sized> ConfigureBuild<'a, R> {
    pub fn new(source_dir: impl Into<PathBuf>, runner: &'a R) -> Self {
        ConfigureBuild {
            source_dir: source_dir.into(),
            runner,
            make: find_make().unwrap_or_else(|| PathBuf::from("make")),
        }
    }

    /// Use a specific `make` executable.
    pub fn make_program(mut self, make: impl Into<PathBuf>) -> Self {
        self.make = make.into();
        self
    }

    /// Configure and build.
    pub fn run(&self, plan: &BuildPlan) -> Result<(), BuildError> {
        self.configure(plan)?;
        self.compile(plan)
    }

    /// Run `./configure` with the plan's arguments.
    pub fn configure(&self, plan: &BuildPlan) -> Result<(), BuildError> {
        tracing::debug!("configuring MacVim in {}", self.source_dir.display());

        let cmd = ProcessBuilder::new("./configure").args(plan.configure_args());
        self.exec(plan, cmd)
    }

    /// Run `make`.
    pub fn compile(&self, plan: &BuildPlan) -> Result<(), BuildError> {
        tracing::debug!("building MacVim");

        let cmd = ProcessBuilder::new(&self.make);
        self.exec(plan, cmd)
    }

    fn exec(&self, plan: &BuildPlan, cmd: ProcessBuilder) -> Result<(), BuildError> {
        let cmd = plan.apply_environment(cmd).cwd(&self.source_dir);
        let command = cmd.display_command();
        tracing::debug!("running `{}`", command);

        let output = self
            .runner
            .run(&cmd)
            .map_err(|e| BuildError::Spawn {
                command: command.clone(),
                reason: format!("{:#}", e),
            })?;

        check_output(command, output)
    }
}

fn check_output(command: String, output: ProcessOutput) -> Result<(), BuildError> {
    if output.success() {
        return Ok(());
    }
    Err(BuildError::ExternalBuildFailure {
        command,
        code: output.code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
