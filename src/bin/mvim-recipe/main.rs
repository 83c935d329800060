//! mvim-recipe CLI - build, install and verify MacVim

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use mvim_recipe::builder::{BuildError, PlanError};
use mvim_recipe::core::option::OptionError;
use mvim_recipe::ops::{InstallError, VerifyError};
use mvim_recipe::util::diagnostic::{emit, Diagnostic};
use mvim_recipe::util::shell::{ColorChoice, Shell};
use mvim_recipe::util::GlobalContext;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();
    let verbose = cli.verbose;

    if let Err(e) = run(cli, color) {
        emit(&to_diagnostic(&e, verbose), color);
        std::process::exit(1);
    }
}

fn run(cli: Cli, ansi: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("mvim_recipe=debug")
    } else {
        EnvFilter::new("mvim_recipe=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(ansi)
        .without_time()
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Shell::from_flags(cli.quiet, cli.verbose, color);

    // Execute command
    match cli.command {
        Commands::Info(args) => commands::info::execute(args),
        Commands::Options(args) => commands::options::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
        Commands::Plan(args) => commands::plan::execute(args, &GlobalContext::new(shell)?),
        Commands::Install(args) => commands::install::execute(args, &GlobalContext::new(shell)?),
        Commands::Verify(args) => commands::verify::execute(args, &shell),
    }
}

/// Render known errors with their own diagnostics, anything else with its chain.
///
/// `verbose` puts the whole output of a failed build step in the diagnostic.
fn to_diagnostic(err: &anyhow::Error, verbose: bool) -> Diagnostic {
    if let Some(e) = err.downcast_ref::<OptionError>() {
        return e.to_diagnostic();
    }
    if let Some(e) = err.downcast_ref::<PlanError>() {
        return e.to_diagnostic();
    }
    if let Some(e) = err.downcast_ref::<BuildError>() {
        return e.to_diagnostic_with_output(verbose);
    }
    if let Some(e) = err.downcast_ref::<InstallError>() {
        return e.to_diagnostic();
    }
    if let Some(e) = err.downcast_ref::<VerifyError>() {
        return e.to_diagnostic();
    }
    Diagnostic::error(format!("{:#}", err))
}
