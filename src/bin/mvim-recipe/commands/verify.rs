//! `mvim-recipe verify` command

use anyhow::Result;

use crate::cli::VerifyArgs;
use mvim_recipe::ops::verify::{check, Expectation, Interpreter, LinkageCheck};
use mvim_recipe::util::process::SystemRunner;
use mvim_recipe::util::shell::{Shell, Status};

pub fn execute(args: VerifyArgs, shell: &Shell) -> Result<()> {
    let mut expectation = Expectation::default();
    if !args.markers.is_empty() {
        expectation.markers = args.markers;
    }

    if args.python {
        expectation.linkage.push(LinkageCheck::python3(args.python_prefix));
        expectation.round_trips.push(Interpreter::Python3);
    }
    if args.ruby {
        expectation.round_trips.push(Interpreter::Ruby);
    }
    if args.lua {
        expectation.markers.push("+lua".to_string());
        expectation.round_trips.push(Interpreter::Lua);
    }

    shell.status(Status::Verifying, args.binary.display());
    check(&args.binary, &expectation, &SystemRunner)?;
    shell.status(Status::Verified, args.binary.display());

    Ok(())
}
