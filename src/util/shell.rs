//! Centralized shell output and progress management.
//!
//! All user-facing status lines go through [`Shell`]. Diagnostic detail goes
//! through `tracing` instead.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + spinners
    #[default]
    Normal,
    /// --verbose: immediate status lines, no spinners
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Never use ANSI colors.
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Installed,
    Verified,

    // In-progress statuses (cyan)
    Resolving,
    Planning,
    Configuring,
    Building,
    Installing,
    Linking,
    Verifying,

    // Warning statuses (yellow)
    Skipped,
    Warning,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Installed => "Installed",
            Status::Verified => "Verified",
            Status::Resolving => "Resolving",
            Status::Planning => "Planning",
            Status::Configuring => "Configuring",
            Status::Building => "Building",
            Status::Installing => "Installing",
            Status::Linking => "Linking",
            Status::Verifying => "Verifying",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Finished | Status::Installed | Status::Verified => "\x1b[1;32m",
            Status::Resolving
            | Status::Planning
            | Status::Configuring
            | Status::Building
            | Status::Installing
            | Status::Linking
            | Status::Verifying => "\x1b[1;36m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
        }
    }
}

/// Width status words are right-aligned to.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
    /// Whether stderr is a terminal that can host a spinner.
    interactive: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let interactive = io::stderr().is_terminal();
        let use_color = match color {
            ColorChoice::Auto => interactive,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
            interactive,
        }
    }

    /// Create a shell from CLI flags. Quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    /// A shell that prints only warnings. Used by library callers and tests.
    pub fn quiet() -> Self {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`. In quiet mode only warnings print.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Warning {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Start a spinner for a long-running step.
    ///
    /// Only normal verbosity on a terminal animates; otherwise the status line
    /// is printed once up front.
    pub fn spinner(&self, status: Status, msg: impl Display) -> Spinner<'_> {
        let msg = msg.to_string();
        let pb = if self.verbosity == Verbosity::Normal && self.interactive {
            let pb = ProgressBar::new_spinner();
            let template = format!("{{spinner:.cyan}} {:>width$} {{msg}}", status.as_str(), width = STATUS_WIDTH - 2);
            if let Ok(style) = ProgressStyle::default_spinner().template(&template) {
                pb.set_style(style);
            }
            pb.set_message(msg.clone());
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            self.status(status, &msg);
            None
        };

        Spinner {
            shell: self,
            pb,
            start: Instant::now(),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// A running spinner. Dropping it without finishing clears it silently.
pub struct Spinner<'a> {
    shell: &'a Shell,
    pb: Option<ProgressBar>,
    start: Instant,
}

impl Spinner<'_> {
    /// Stop the spinner and report the step as finished.
    pub fn finish(mut self, msg: impl Display) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        self.shell.status(
            Status::Finished,
            format!("{} in {}", msg, format_duration(self.start.elapsed())),
        );
    }
}

impl Drop for Spinner<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
