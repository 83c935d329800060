//! `mvim-recipe plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use mvim_recipe::builder::plan::{self, Action, EnvironmentOverride};
use mvim_recipe::core::option;
use mvim_recipe::util::GlobalContext;

pub fn execute(args: PlanArgs, ctx: &GlobalContext) -> Result<()> {
    let env = ctx.environment(&args.env.overrides())?;
    let requests = ctx.option_requests(&args.options);

    let options = option::resolve(requests.as_slice(), &env)?;
    let plan = plan::build(&options, &env)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let enabled: Vec<&str> = options.enabled().map(|o| o.name()).collect();
    println!(
        "# MacVim for {} ({}), options: {}",
        env.os_version,
        env.preferred_arch,
        enabled.join(", ")
    );

    println!("# configure arguments");
    for arg in plan.configure_args() {
        println!("  {}", arg);
    }

    println!("# environment");
    for o in plan.environment() {
        match o {
            EnvironmentOverride::Unset { name } => println!("  unset {}", name),
            EnvironmentOverride::Set { name, value } => println!("  set {}={}", name, value),
        }
    }

    println!("# post-install actions");
    for action in plan.post_install_actions() {
        match action {
            Action::InstallDirectory { src, dest } => {
                println!("  install {} -> {}", src.display(), dest.display())
            }
            Action::CreateSymlink { target, link } => {
                println!("  link {} -> {}", link.display(), target.display())
            }
        }
    }

    Ok(())
}
