//! Implementation of `mvim-recipe install`.
//!
//! Resolve options, build the plan, run the external build, install, and
//! optionally verify. Everything that can be rejected without running a
//! subprocess is rejected first.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::configure::ConfigureBuild;
use crate::builder::plan::{self, Action, BuildPlan, PRIMARY_COMMAND};
use crate::core::environment::EnvironmentFacts;
use crate::core::option::{self, ResolvedOptions};
use crate::ops::install::{Filesystem, Installer};
use crate::ops::verify::{self, Expectation};
use crate::util::process::CommandRunner;
use crate::util::shell::{Shell, Status};

/// Inputs for one install.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Unpacked MacVim source tree.
    pub source_dir: PathBuf,
    /// Requested option flags, e.g. `with-lua`.
    pub options: Vec<String>,
    pub env: EnvironmentFacts,
    /// Assume the source tree already holds a finished build.
    pub skip_build: bool,
    /// Run verification after installing.
    pub verify: bool,
    /// `make` executable to use instead of the one found on PATH.
    pub make: Option<PathBuf>,
}

impl InstallRequest {
    pub fn new(source_dir: impl Into<PathBuf>, env: EnvironmentFacts) -> Self {
        InstallRequest {
            source_dir: source_dir.into(),
            options: Vec::new(),
            env,
            skip_build: false,
            verify: false,
            make: None,
        }
    }
}

/// What an install did.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub options: ResolvedOptions,
    /// The plan that was executed.
    pub plan: BuildPlan,
    pub keg: PathBuf,
    /// Links created, in order.
    pub links: Vec<PathBuf>,
    /// Whether verification ran (it only returns on success).
    pub verified: bool,
}

impl InstallReport {
    /// Path of the installed launcher.
    pub fn launcher(&self) -> PathBuf {
        self.keg.join("bin").join(PRIMARY_COMMAND)
    }
}

/// Run the whole recipe.
pub fn install_recipe<R, F>(
    request: &InstallRequest,
    runner: &R,
    fs: &F,
    shell: &Shell,
) -> Result<InstallReport>
where
    R: CommandRunner + ?Sized,
    F: Filesystem + ?Sized,
{
    let env = &request.env;

    shell.status(Status::Resolving, "build options");
    let options = option::resolve(request.options.as_slice(), env)?;
    tracing::debug!(options = ?options.to_map(), "resolved options");

    shell.status(
        Status::Planning,
        format!("MacVim for {} ({})", env.os_version, env.preferred_arch),
    );
    let plan = plan::build(&options, env)?;

    if request.skip_build {
        shell.status(Status::Skipped, "external build");
    } else {
        let mut builder = ConfigureBuild::new(&request.source_dir, runner);
        if let Some(make) = &request.make {
            builder = builder.make_program(make);
        }

        let spinner = shell.spinner(Status::Configuring, request.source_dir.display());
        builder.configure(&plan)?;
        spinner.finish("configure");

        let spinner = shell.spinner(Status::Building, "MacVim");
        builder.compile(&plan)?;
        spinner.finish("make");
    }

    let report_plan = plan.clone();
    let links: Vec<PathBuf> = plan
        .post_install_actions()
        .iter()
        .filter_map(|a| match a {
            Action::CreateSymlink { link, .. } => Some(link.clone()),
            Action::InstallDirectory { .. } => None,
        })
        .collect();

    shell.status(Status::Installing, env.keg.display());
    Installer::new(&request.source_dir, fs)
        .install(plan)
        .with_context(|| format!("failed to install into {}", env.keg.display()))?;
    shell.status(
        Status::Linking,
        format!("{} commands into {}", links.len(), env.bin_dir().display()),
    );

    let mut report = InstallReport {
        options,
        plan: report_plan,
        keg: env.keg.clone(),
        links,
        verified: false,
    };

    if request.verify {
        let launcher = report.launcher();
        shell.status(Status::Verifying, launcher.display());
        let expectation = Expectation::for_options(&report.options);
        verify::check(&launcher, &expectation, runner)?;
        shell.status(Status::Verified, launcher.display());
        report.verified = true;
    }

    shell.status(Status::Installed, format!("macvim into {}", report.keg.display()));
    Ok(report)
}
