//! Build plan generation.
//!
//! A [`BuildPlan`] is the complete, ordered description of one MacVim build:
//! the `configure` arguments, the environment adjustments for the external
//! build, and the filesystem actions that install the result. It is a pure
//! function of the resolved options and the host facts.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::core::environment::{EnvironmentFacts, MacOsVersion};
use crate::core::option::{BuildOption, ResolvedOptions};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::process::ProcessBuilder;

/// Application bundle produced by `make`, relative to the source tree.
pub const BUILD_OUTPUT: &str = "src/MacVim/build/Release/MacVim.app";

/// Bundle directory name inside the keg.
pub const APP_BUNDLE: &str = "MacVim.app";

/// Launcher script inside the bundle, and the name it is linked under.
pub const PRIMARY_COMMAND: &str = "mvim";

/// Aliases always linked to the launcher.
pub const BASE_ALIASES: [&str; 7] = [
    "mvimdiff", "mview", "mvimex", "gvim", "gvimdiff", "gview", "gvimex",
];

/// Aliases that shadow the system vim, linked only on request.
pub const OVERRIDE_ALIASES: [&str; 5] = ["vi", "vim", "vimdiff", "view", "vimex"];

/// Value passed to `--with-compiledby`.
pub const COMPILED_BY: &str = "HomebrewCustom";

/// A filesystem step performed after the external build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Copy a build output directory (relative to the source tree) to `dest`.
    InstallDirectory { src: PathBuf, dest: PathBuf },
    /// Create `link` pointing at `target`. A relative target is resolved
    /// against the link's directory.
    CreateSymlink { target: PathBuf, link: PathBuf },
}

impl Action {
    pub fn symlink(target: impl Into<PathBuf>, link: impl Into<PathBuf>) -> Self {
        Action::CreateSymlink {
            target: target.into(),
            link: link.into(),
        }
    }
}

/// An environment adjustment applied to the external build's child processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EnvironmentOverride {
    Unset { name: String },
    Set { name: String, value: String },
}

impl EnvironmentOverride {
    pub fn unset(name: impl Into<String>) -> Self {
        EnvironmentOverride::Unset { name: name.into() }
    }

    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        EnvironmentOverride::Set {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Apply to a child process. The parent environment is untouched.
    pub fn apply(&self, cmd: ProcessBuilder) -> ProcessBuilder {
        match self {
            EnvironmentOverride::Unset { name } => cmd.env_remove(name),
            EnvironmentOverride::Set { name, value } => cmd.env(name, value),
        }
    }
}

/// A complete build plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    configure_args: Vec<String>,
    environment: Vec<EnvironmentOverride>,
    post_install_actions: Vec<Action>,
}

impl BuildPlan {
    /// Arguments for `./configure`, in order.
    pub fn configure_args(&self) -> &[String] {
        &self.configure_args
    }

    /// Environment adjustments for `configure` and `make`.
    pub fn environment(&self) -> &[EnvironmentOverride] {
        &self.environment
    }

    pub fn post_install_actions(&self) -> &[Action] {
        &self.post_install_actions
    }

    /// Apply every environment override to a command.
    pub fn apply_environment(&self, cmd: ProcessBuilder) -> ProcessBuilder {
        self.environment.iter().fold(cmd, |cmd, o| o.apply(cmd))
    }

    /// Consume the plan, yielding its install actions.
    pub fn into_actions(self) -> Vec<Action> {
        self.post_install_actions
    }
}

/// Error while constructing a build plan.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum PlanError {
    #[error("`{option}` was requested but no installed location is known for `{dependency}`")]
    #[diagnostic(
        code(mvim_recipe::plan::missing_dependency),
        help("pass `--dep {dependency}=<path>`")
    )]
    MissingDependencyLocation { option: String, dependency: String },
}

impl PlanError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PlanError::MissingDependencyLocation { option, dependency } => Diagnostic::error(
                format!("no installed location is known for `{}`", dependency),
            )
            .with_context(format!("required because `{}` is enabled", option))
            .with_suggestion(suggestions::DEPENDENCY_LOCATION),
        }
    }
}

/// `SDKROOT` breaks Ruby header discovery on these releases.
pub fn clears_sdkroot(os: MacOsVersion) -> bool {
    matches!(os, MacOsVersion::Yosemite | MacOsVersion::Sierra)
}

/// Whether the build should be forced onto clang.
pub fn uses_clang(os: MacOsVersion) -> bool {
    os >= MacOsVersion::Lion
}

/// Ordered accumulator for a [`BuildPlan`].
///
/// Each step appends to the plan when its guard holds. [`build`] runs them in
/// the fixed order that `configure` expects.
#[derive(Debug)]
pub struct PlanBuilder<'a> {
    options: &'a ResolvedOptions,
    env: &'a EnvironmentFacts,
    args: Vec<String>,
    environment: Vec<EnvironmentOverride>,
    actions: Vec<Action>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(options: &'a ResolvedOptions, env: &'a EnvironmentFacts) -> Self {
        PlanBuilder {
            options,
            env,
            args: Vec::new(),
            environment: Vec::new(),
            actions: Vec::new(),
        }
    }

    fn arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    fn enabled(&self, option: BuildOption) -> bool {
        self.options.is_enabled(option)
    }

    /// Feature set, architecture, and fixed interpreters.
    pub fn baseline(&mut self) {
        self.arg("--with-features=huge");
        self.arg("--enable-multibyte");
        self.arg(format!("--with-macarchs={}", self.env.preferred_arch));
        self.arg("--enable-perlinterp");
        self.arg("--enable-tclinterp");
        self.arg("--enable-terminal");
        self.arg("--with-tlib=ncurses");
        self.arg(format!("--with-compiledby={}", COMPILED_BY));
        self.arg(format!("--with-local-dir={}", self.env.prefix.display()));
    }

    pub fn cscope(&mut self) {
        if self.enabled(BuildOption::Cscope) {
            self.arg("--enable-cscope");
        }
    }

    pub fn lua(&mut self) -> Result<(), PlanError> {
        if !self.enabled(BuildOption::Lua) {
            return Ok(());
        }

        let prefix = self.env.dependency_location("lua").ok_or_else(|| {
            PlanError::MissingDependencyLocation {
                option: BuildOption::Lua.name().to_string(),
                dependency: "lua".to_string(),
            }
        })?;
        let prefix_arg = format!("--with-lua-prefix={}", prefix.display());

        self.arg("--enable-luainterp");
        self.arg(prefix_arg);
        Ok(())
    }

    pub fn ruby(&mut self) {
        self.interpreter("--enable-rubyinterp", BuildOption::DynamicRuby);
    }

    pub fn python(&mut self) {
        self.interpreter("--enable-python3interp", BuildOption::DynamicPython);
    }

    /// Static linkage unless the paired dynamic switch is on.
    fn interpreter(&mut self, flag: &str, dynamic: BuildOption) {
        if self.enabled(dynamic) {
            self.arg(format!("{}=dynamic", flag));
        } else {
            self.arg(flag);
        }
    }

    pub fn environment_overrides(&mut self) {
        if clears_sdkroot(self.env.os_version) {
            self.environment.push(EnvironmentOverride::unset("SDKROOT"));
        }
        // MacVim ships no Python packages; a user PYTHONPATH only confuses configure.
        self.environment.push(EnvironmentOverride::unset("PYTHONPATH"));
        if uses_clang(self.env.os_version) {
            self.environment.push(EnvironmentOverride::set("CC", "clang"));
        }
    }

    /// Bundle install, launcher link, and the base alias set.
    pub fn install_actions(&mut self) {
        let keg = &self.env.keg;
        let bin = self.env.bin_dir();

        self.actions.push(Action::InstallDirectory {
            src: PathBuf::from(BUILD_OUTPUT),
            dest: keg.join(APP_BUNDLE),
        });
        self.actions.push(Action::symlink(
            launcher_path(keg),
            bin.join(PRIMARY_COMMAND),
        ));
        self.push_aliases(&bin, &BASE_ALIASES);
    }

    pub fn override_aliases(&mut self) {
        if self.enabled(BuildOption::OverrideSystemVim) {
            let bin = self.env.bin_dir();
            self.push_aliases(&bin, &OVERRIDE_ALIASES);
        }
    }

    fn push_aliases(&mut self, bin: &Path, aliases: &[&str]) {
        for alias in aliases {
            self.actions
                .push(Action::symlink(PRIMARY_COMMAND, bin.join(alias)));
        }
    }

    pub fn finish(self) -> BuildPlan {
        BuildPlan {
            configure_args: self.args,
            environment: self.environment,
            post_install_actions: self.actions,
        }
    }
}

/// Location of the launcher script inside an installed bundle.
pub fn launcher_path(keg: &Path) -> PathBuf {
    keg.join(APP_BUNDLE)
        .join("Contents")
        .join("bin")
        .join(PRIMARY_COMMAND)
}

/// Build the plan for the given options and host.
pub fn build(options: &ResolvedOptions, env: &EnvironmentFacts) -> Result<BuildPlan, PlanError> {
    let mut builder = PlanBuilder::new(options, env);

    builder.baseline();
    builder.cscope();
    builder.lua()?;
    builder.ruby();
    builder.python();
    builder.environment_overrides();
    builder.install_actions();
    builder.override_aliases();

    let plan = builder.finish();
    tracing::debug!(
        args = plan.configure_args.len(),
        actions = plan.post_install_actions.len(),
        "built plan"
    );
    Ok(plan)
}
