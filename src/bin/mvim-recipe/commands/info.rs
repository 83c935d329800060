//! `mvim-recipe info` command

use anyhow::Result;

use crate::cli::InfoArgs;
use mvim_recipe::core::environment::detect_os_version;
use mvim_recipe::core::MACVIM;

pub fn execute(args: InfoArgs) -> Result<()> {
    let recipe = MACVIM;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    println!("{} {}", recipe.name, recipe.version_with_revision());
    println!("{}", recipe.desc);
    println!();
    println!("homepage: {}", recipe.homepage);
    println!("source:   {}", recipe.url);
    println!("sha256:   {}", recipe.sha256);
    println!("head:     {}", recipe.head);

    if !recipe.bottles.is_empty() {
        println!();
        println!("bottles:");
        for bottle in recipe.bottles {
            println!("  {:<12} {}", bottle.os.as_str(), bottle.sha256);
        }
    }

    // Off macOS there is no host release to match against.
    if let Ok(os) = detect_os_version() {
        println!();
        match recipe.bottle_for(os) {
            Some(bottle) => println!("this host ({}): bottle {}", os, bottle.sha256),
            None => println!("this host ({}): no bottle, builds from source", os),
        }
    }

    Ok(())
}
