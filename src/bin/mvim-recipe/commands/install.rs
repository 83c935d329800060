//! `mvim-recipe install` command

use anyhow::Result;

use crate::cli::InstallArgs;
use mvim_recipe::ops::{install_recipe, HostFilesystem, InstallRequest};
use mvim_recipe::util::process::SystemRunner;
use mvim_recipe::util::GlobalContext;

pub fn execute(args: InstallArgs, ctx: &GlobalContext) -> Result<()> {
    let env = ctx.environment(&args.env.overrides())?;

    let source_dir = ctx.absolute(&args.source_dir);

    if env.keg.exists() {
        ctx.shell()
            .warn(format!("replacing existing install at {}", env.keg.display()));
    }

    let mut request = InstallRequest::new(source_dir, env);
    request.options = ctx.option_requests(&args.options);
    request.skip_build = args.skip_build;
    request.verify = args.verify;
    request.make = args.make;

    let report = install_recipe(&request, &SystemRunner, &HostFilesystem, ctx.shell())?;

    println!("{}", report.launcher().display());
    for link in &report.links {
        tracing::debug!("linked {}", link.display());
    }

    Ok(())
}
