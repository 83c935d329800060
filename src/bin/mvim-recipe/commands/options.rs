//! `mvim-recipe options` command

use anyhow::Result;

use crate::cli::OptionsArgs;
use mvim_recipe::core::OptionRegistry;

pub fn execute(args: OptionsArgs) -> Result<()> {
    let registry = OptionRegistry::standard();

    if args.json {
        println!("{}", serde_json::to_string_pretty(registry.specs())?);
        return Ok(());
    }

    println!(
        "{:<22} {:<12} {:<8} {:<28} DESCRIPTION",
        "OPTION", "KIND", "DEFAULT", "FLAG"
    );
    for spec in registry.specs() {
        let flag = spec.flag().map(|f| format!("--{}", f)).unwrap_or_else(|| "-".to_string());
        let default = if spec.kind.default_enabled() { "on" } else { "off" };

        print!(
            "{:<22} {:<12} {:<8} {:<28} {}",
            spec.name(),
            spec.kind.as_str(),
            default,
            flag,
            spec.description
        );
        if !spec.deprecated_aliases.is_empty() {
            print!(" (deprecated: {})", spec.deprecated_aliases.join(", "));
        }
        println!();
    }

    Ok(())
}
