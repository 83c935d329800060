//! Build option registry and resolution.
//!
//! Options form a closed set ([`BuildOption`]). Users refer to them by flag
//! (`with-lua`, `without-ruby`) only at the resolution boundary; everything
//! downstream works with the enum.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::environment::EnvironmentFacts;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Every option the recipe recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOption {
    Xcode,
    Cscope,
    Python,
    Lua,
    Ruby,
    OverrideSystemVim,
    DynamicRuby,
    DynamicPython,
}

impl BuildOption {
    /// Canonical option name.
    pub fn name(&self) -> &'static str {
        match self {
            BuildOption::Xcode => "xcode",
            BuildOption::Cscope => "cscope",
            BuildOption::Python => "python",
            BuildOption::Lua => "lua",
            BuildOption::Ruby => "ruby",
            BuildOption::OverrideSystemVim => "override-system-vim",
            BuildOption::DynamicRuby => "dynamic-ruby",
            BuildOption::DynamicPython => "dynamic-python",
        }
    }
}

impl fmt::Display for BuildOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an option gets its default and which flag toggles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKind {
    /// Dependency enabled unless `without-<name>` is requested.
    Recommended,
    /// Dependency disabled unless `with-<name>` is requested.
    Optional,
    /// Needed to build; cannot be toggled.
    BuildOnly,
    /// Plain boolean switch, off unless `with-<name>` is requested.
    Switch,
}

impl OptionKind {
    /// Value used when the option is not requested.
    pub fn default_enabled(&self) -> bool {
        match self {
            OptionKind::Recommended | OptionKind::BuildOnly => true,
            OptionKind::Optional | OptionKind::Switch => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Recommended => "recommended",
            OptionKind::Optional => "optional",
            OptionKind::BuildOnly => "build",
            OptionKind::Switch => "switch",
        }
    }
}

/// Registry entry for one option.
#[derive(Debug, Clone, Serialize)]
pub struct OptionSpec {
    pub option: BuildOption,
    pub kind: OptionKind,
    pub description: &'static str,
    /// Old spellings translated to [`OptionSpec::flag`] with a warning.
    pub deprecated_aliases: &'static [&'static str],
    /// Options sharing a group may not be enabled together.
    pub exclusive_group: Option<&'static str>,
}

impl OptionSpec {
    const fn new(option: BuildOption, kind: OptionKind, description: &'static str) -> Self {
        OptionSpec {
            option,
            kind,
            description,
            deprecated_aliases: &[],
            exclusive_group: None,
        }
    }

    const fn deprecated(mut self, aliases: &'static [&'static str]) -> Self {
        self.deprecated_aliases = aliases;
        self
    }

    /// Place this option in a mutual-exclusion group.
    pub const fn exclusive(mut self, group: &'static str) -> Self {
        self.exclusive_group = Some(group);
        self
    }

    pub fn name(&self) -> &'static str {
        self.option.name()
    }

    /// The user-facing flag that moves this option off its default.
    pub fn flag(&self) -> Option<String> {
        match self.kind {
            OptionKind::Recommended => Some(format!("without-{}", self.name())),
            OptionKind::Optional | OptionKind::Switch => Some(format!("with-{}", self.name())),
            OptionKind::BuildOnly => None,
        }
    }

    /// Value the option takes when its flag is requested.
    fn requested_value(&self) -> bool {
        !self.kind.default_enabled()
    }
}

/// Options declared by the MacVim recipe, in declaration order.
pub const STANDARD_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(BuildOption::Xcode, OptionKind::BuildOnly, "Xcode toolchain"),
    OptionSpec::new(BuildOption::Cscope, OptionKind::Recommended, "Build with cscope support"),
    OptionSpec::new(BuildOption::Python, OptionKind::Recommended, "Build with python support"),
    OptionSpec::new(BuildOption::Lua, OptionKind::Optional, "Build with lua support"),
    OptionSpec::new(BuildOption::Ruby, OptionKind::Recommended, "Build with ruby support"),
    OptionSpec::new(
        BuildOption::OverrideSystemVim,
        OptionKind::Switch,
        "Override system vim",
    )
    .deprecated(&["override-system-vim"]),
    OptionSpec::new(
        BuildOption::DynamicRuby,
        OptionKind::Switch,
        "Build with dynamic ruby support",
    ),
    OptionSpec::new(
        BuildOption::DynamicPython,
        OptionKind::Switch,
        "Build with dynamic python support",
    ),
];

/// Errors raised while resolving requested options.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum OptionError {
    #[error("unknown build option `{name}`")]
    #[diagnostic(
        code(mvim_recipe::option::unknown),
        help("run `mvim-recipe options` to list recognized flags")
    )]
    UnknownOption {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("options {} cannot be combined", .options.join(", "))]
    #[diagnostic(code(mvim_recipe::option::conflict))]
    ConflictingOptions { group: String, options: Vec<String> },
}

impl OptionError {
    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            OptionError::UnknownOption { name, suggestions: flags } => {
                let mut diag = Diagnostic::error(format!("unknown build option `{}`", name));
                for flag in flags {
                    diag = diag.with_suggestion(format!("did you mean `--{}`?", flag));
                }
                diag.with_suggestion(suggestions::LIST_OPTIONS)
            }
            OptionError::ConflictingOptions { group, options } => Diagnostic::error(format!(
                "options {} cannot be combined",
                options.join(", ")
            ))
            .with_context(format!("all belong to the exclusive group `{}`", group))
            .with_suggestion("Request at most one of them"),
        }
    }
}

/// The on/off value of every registered option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    values: BTreeMap<BuildOption, bool>,
}

impl ResolvedOptions {
    /// Whether the option is on. Unregistered options are off.
    pub fn is_enabled(&self, option: BuildOption) -> bool {
        self.values.get(&option).copied().unwrap_or(false)
    }

    /// All resolved values in option order.
    pub fn iter(&self) -> impl Iterator<Item = (BuildOption, bool)> + '_ {
        self.values.iter().map(|(o, v)| (*o, *v))
    }

    /// Options that resolved to on.
    pub fn enabled(&self) -> impl Iterator<Item = BuildOption> + '_ {
        self.iter().filter(|(_, v)| *v).map(|(o, _)| o)
    }

    /// Mapping from option name to value.
    pub fn to_map(&self) -> BTreeMap<&'static str, bool> {
        self.iter().map(|(o, v)| (o.name(), v)).collect()
    }
}

/// A set of option specs that requests are resolved against.
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    specs: Vec<OptionSpec>,
}

impl OptionRegistry {
    pub fn new(specs: Vec<OptionSpec>) -> Self {
        OptionRegistry { specs }
    }

    /// The recipe's own options.
    pub fn standard() -> Self {
        OptionRegistry::new(STANDARD_OPTIONS.to_vec())
    }

    pub fn specs(&self) -> &[OptionSpec] {
        &self.specs
    }

    /// Resolve requested flags into a value for every registered option.
    ///
    /// Requests may carry a leading `--`. Deprecated aliases are translated
    /// and logged once. Fails on the first unrecognized flag, or when two
    /// enabled options share an exclusive group.
    pub fn resolve<S: AsRef<str>>(
        &self,
        requested: &[S],
        env: &EnvironmentFacts,
    ) -> Result<ResolvedOptions, OptionError> {
        let _span = tracing::debug_span!(
            "resolve_options",
            os = %env.os_version,
            arch = %env.preferred_arch
        )
        .entered();

        let mut values: BTreeMap<BuildOption, bool> = self
            .specs
            .iter()
            .map(|s| (s.option, s.kind.default_enabled()))
            .collect();

        let mut warned = BTreeSet::new();
        for raw in requested {
            let request = normalize(raw.as_ref());
            let spec = self.lookup(request, &mut warned)?;
            tracing::debug!("requested --{} sets {}", request, spec.name());
            values.insert(spec.option, spec.requested_value());
        }

        // Build-only requirements ignore requests entirely.
        for spec in &self.specs {
            if spec.kind == OptionKind::BuildOnly {
                values.insert(spec.option, true);
            }
        }

        self.check_exclusive_groups(&values)?;

        Ok(ResolvedOptions { values })
    }

    fn lookup(
        &self,
        request: &str,
        warned: &mut BTreeSet<&'static str>,
    ) -> Result<&OptionSpec, OptionError> {
        for spec in &self.specs {
            if spec.flag().as_deref() == Some(request) {
                return Ok(spec);
            }
            if let Some(alias) = spec.deprecated_aliases.iter().find(|a| **a == request) {
                if warned.insert(*alias) {
                    tracing::warn!(
                        "option `{}` is deprecated; use `--{}` instead",
                        alias,
                        spec.flag().unwrap_or_default()
                    );
                }
                return Ok(spec);
            }
        }

        Err(OptionError::UnknownOption {
            name: request.to_string(),
            suggestions: self.suggest(request),
        })
    }

    /// Registered flags for the option the request seems to be about.
    fn suggest(&self, request: &str) -> Vec<String> {
        let bare = request
            .strip_prefix("without-")
            .or_else(|| request.strip_prefix("with-"))
            .unwrap_or(request);

        self.specs
            .iter()
            .filter(|s| s.name() == bare)
            .filter_map(OptionSpec::flag)
            .filter(|f| f != request)
            .collect()
    }

    fn check_exclusive_groups(&self, values: &BTreeMap<BuildOption, bool>) -> Result<(), OptionError> {
        let mut groups: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for spec in &self.specs {
            if let Some(group) = spec.exclusive_group {
                if values.get(&spec.option).copied().unwrap_or(false) {
                    groups.entry(group).or_default().push(spec.name().to_string());
                }
            }
        }

        match groups.into_iter().find(|(_, enabled)| enabled.len() > 1) {
            Some((group, options)) => Err(OptionError::ConflictingOptions {
                group: group.to_string(),
                options,
            }),
            None => Ok(()),
        }
    }
}

fn normalize(request: &str) -> &str {
    let request = request.trim();
    request.strip_prefix("--").unwrap_or(request)
}

/// Resolve against the standard registry.
pub fn resolve<S: AsRef<str>>(
    requested: &[S],
    env: &EnvironmentFacts,
) -> Result<ResolvedOptions, OptionError> {
    OptionRegistry::standard().resolve(requested, env)
}
