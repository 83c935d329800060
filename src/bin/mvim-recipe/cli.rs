//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use mvim_recipe::core::MacOsVersion;
use mvim_recipe::util::EnvironmentOverrides;

/// mvim-recipe - build, install and verify MacVim
#[derive(Parser)]
#[command(name = "mvim-recipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the recipe's package metadata
    Info(InfoArgs),

    /// List recognized build options
    Options(OptionsArgs),

    /// Print the build plan for a set of options
    Plan(PlanArgs),

    /// Build MacVim from a source tree and install it
    Install(InstallArgs),

    /// Check an installed mvim
    Verify(VerifyArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Host facts that would otherwise come from config or detection.
#[derive(Args, Clone, Debug, Default)]
pub struct EnvArgs {
    /// macOS release, e.g. `sierra` or `10.12`
    #[arg(long, value_name = "RELEASE")]
    pub os_version: Option<MacOsVersion>,

    /// Architecture to build for
    #[arg(long)]
    pub arch: Option<String>,

    /// Host prefix (default /usr/local)
    #[arg(long)]
    pub prefix: Option<PathBuf>,

    /// Installation prefix for MacVim
    #[arg(long)]
    pub keg: Option<PathBuf>,

    /// Installed location of a dependency
    #[arg(long = "dep", value_name = "NAME=PATH", value_parser = parse_dep)]
    pub deps: Vec<(String, PathBuf)>,
}

impl EnvArgs {
    pub fn overrides(&self) -> EnvironmentOverrides {
        EnvironmentOverrides {
            os_version: self.os_version,
            arch: self.arch.clone(),
            prefix: self.prefix.clone(),
            keg: self.keg.clone(),
            dependencies: self.deps.clone(),
        }
    }
}

fn parse_dep(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got `{}`", s))?;
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got `{}`", s));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

#[derive(Args)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct OptionsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Option flag to request, e.g. `with-lua` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "FLAG", allow_hyphen_values = true)]
    pub options: Vec<String>,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Unpacked MacVim source tree
    #[arg(default_value = ".")]
    pub source_dir: PathBuf,

    /// Option flag to request, e.g. `with-lua` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "FLAG", allow_hyphen_values = true)]
    pub options: Vec<String>,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Install an existing build without running configure and make
    #[arg(long)]
    pub skip_build: bool,

    /// Verify the installed binary afterwards
    #[arg(long)]
    pub verify: bool,

    /// `make` executable to use
    #[arg(long, env = "MAKE")]
    pub make: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Path to the installed mvim
    pub binary: PathBuf,

    /// Feature marker that must appear in `--version` (default `+ruby`)
    #[arg(long = "marker", value_name = "MARKER", allow_hyphen_values = true)]
    pub markers: Vec<String>,

    /// Check Python 3 linkage and run a Python round trip
    #[arg(long)]
    pub python: bool,

    /// Run a Ruby round trip
    #[arg(long)]
    pub ruby: bool,

    /// Run a Lua round trip
    #[arg(long)]
    pub lua: bool,

    /// Expected Python exec prefix (default: `python3-config --exec-prefix`)
    #[arg(long, requires = "python")]
    pub python_prefix: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: CompletionShell,
}
