// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Installation planning.
//!
//! Every run of the installer boils down to one [`InstallPlan`]: where to
//! install (scope), which platforms to install into, which skills to install,
//! and a couple of options. The plan is resolved once and never touched
//! again afterwards.
//!
//! # Precedence
//!
//! Each option axis is resolved on its own, in three tiers:
//!
//! 1. Command-line flag for that axis.
//! 2. Prompt answer, only if the flag was absent and a terminal is attached.
//! 3. Default value.
//!
//! Defaults are only ever applied for fully specified invocations (see
//! [`RawFlags::accept_defaults`]) or true interactive sessions. A piped run
//! that leaves scope or platforms unresolved fails with
//! [`OptionError::Underspecified`] instead of guessing.

pub mod prompt;

use crate::{
    catalog::{locate_self_tree, CatalogSource, PackageDescriptor},
    config::InstallerConfig,
    path::default_catalog_cache_dir,
    plan::prompt::{select_many, select_scope, PromptState, Prompter, Selection},
    platform::{PlatformDescriptor, PlatformId, Scope},
};

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Options as given on the command line.
///
/// Every axis is optional. Absence means the axis is left for prompts or
/// defaults to decide.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawFlags {
    /// Installation scope.
    pub scope: Option<Scope>,

    /// Use the installer's own working tree as catalog.
    pub self_install: bool,

    /// Use an explicit local directory as catalog.
    pub source: Option<PathBuf>,

    /// Platforms to install into.
    pub platforms: Vec<PlatformId>,

    /// Skills to install by name.
    pub packages: Vec<String>,

    /// Install every discovered skill.
    pub all_packages: bool,

    /// Install companion commands.
    pub commands: Option<bool>,

    /// Register local installs in the project's ignore file.
    pub gitignore: Option<bool>,

    /// Accept defaults for every unresolved axis without prompting.
    pub accept_defaults: bool,
}

/// Execution context that resolution depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Process is attached to an interactive terminal.
    pub interactive: bool,

    /// Platform to fall back to when none was chosen.
    pub default_platform: PlatformId,
}

impl Environment {
    /// Detect execution context of current process.
    pub fn detect(config: &InstallerConfig) -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
            default_platform: config.default_platform(),
        }
    }
}

/// Fully resolved decisions for one run.
///
/// # Invariant
///
/// - Platform and package listings are never empty.
/// - Ignore file updates are only ever requested for local scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub(crate) scope: Scope,
    pub(crate) platforms: Vec<&'static PlatformDescriptor>,
    pub(crate) packages: Vec<PackageDescriptor>,
    pub(crate) install_companion_commands: bool,
    pub(crate) update_ignore_file: bool,
    pub(crate) self_install: bool,
}

impl InstallPlan {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn platforms(&self) -> &[&'static PlatformDescriptor] {
        &self.platforms
    }

    pub fn packages(&self) -> &[PackageDescriptor] {
        &self.packages
    }

    pub fn install_companion_commands(&self) -> bool {
        self.install_companion_commands
    }

    pub fn update_ignore_file(&self) -> bool {
        self.update_ignore_file
    }

    pub fn self_install(&self) -> bool {
        self.self_install
    }
}

/// Select where the catalog comes from.
///
/// # Errors
///
/// - Return [`OptionError::Contradiction`] if both `--self` and `--source`
///   were given.
/// - Return [`OptionError::SelfLocationUnknown`] if `--self` was given, but
///   no working tree can be found around the running executable.
pub fn resolve_source(
    flags: &RawFlags,
    config: &InstallerConfig,
    executable: Option<&Path>,
) -> Result<CatalogSource> {
    match (flags.self_install, &flags.source) {
        (true, Some(_)) => Err(OptionError::Contradiction(
            "--self cannot be combined with --source".into(),
        )),
        (true, None) => executable
            .and_then(locate_self_tree)
            .map(CatalogSource::SelfTree)
            .ok_or(OptionError::SelfLocationUnknown),
        (false, Some(path)) => Ok(CatalogSource::Local(path.clone())),
        (false, None) => Ok(CatalogSource::Remote {
            url: config.catalog.url.clone(),
            branch: config.catalog.branch.clone(),
            cache_dir: match &config.catalog.cache_dir {
                Some(dir) => dir.clone(),
                None => default_catalog_cache_dir()?,
            },
        }),
    }
}

/// Check that a run can be resolved without guessing.
///
/// Interactive runs and runs that accept defaults always pass. Any other
/// run must name scope and platforms through flags. This check needs no
/// catalog, so callers can run it before anything touches the file system.
///
/// # Errors
///
/// - Return [`OptionError::Underspecified`] listing every missing axis.
pub fn check_required(flags: &RawFlags, env: &Environment) -> Result<()> {
    if env.interactive || flags.accept_defaults {
        return Ok(());
    }

    let mut missing = Vec::new();
    if flags.scope.is_none() {
        missing.push("scope (--global or --local)");
    }
    if flags.platforms.is_empty() {
        missing.push("platforms (e.g. --claude)");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OptionError::Underspecified {
            missing: missing.join(", "),
        })
    }
}

/// Resolve flags, prompts, and defaults into an installation plan.
///
/// Prompts are only issued through `prompter` when the environment is
/// interactive and defaults were not accepted up front.
///
/// # Errors
///
/// - Return [`OptionError::Contradiction`] if flags contradict each other.
/// - Return [`OptionError::UnknownPackage`] if a named skill is not in the
///   catalog.
/// - Return [`OptionError::Underspecified`] if a non-interactive run leaves
///   scope or platforms unresolved.
/// - Return [`OptionError::Prompt`] if a prompt fails or gets cancelled.
#[instrument(skip(flags, env, catalog, prompter), level = "debug")]
pub fn resolve<P>(
    flags: &RawFlags,
    env: &Environment,
    catalog: &[PackageDescriptor],
    prompter: &mut P,
) -> Result<InstallPlan>
where
    P: Prompter + ?Sized,
{
    if flags.all_packages && !flags.packages.is_empty() {
        return Err(OptionError::Contradiction(
            "--skill cannot be combined with --all".into(),
        ));
    }

    if let Some(unknown) = flags
        .packages
        .iter()
        .find(|name| !catalog.iter().any(|package| &package.name == *name))
    {
        return Err(OptionError::UnknownPackage(unknown.clone()));
    }

    let mut scope = flags.scope;
    let mut platforms = (!flags.platforms.is_empty()).then(|| {
        PlatformId::ALL
            .into_iter()
            .filter(|id| flags.platforms.contains(id))
            .collect::<Vec<_>>()
    });
    let mut packages = if flags.all_packages {
        Some(catalog.to_vec())
    } else if !flags.packages.is_empty() {
        Some(
            catalog
                .iter()
                .filter(|package| flags.packages.contains(&package.name))
                .cloned()
                .collect::<Vec<_>>(),
        )
    } else {
        None
    };
    let mut commands = flags.commands;
    let mut gitignore = flags.gitignore;

    check_required(flags, env)?;
    let prompting = env.interactive && !flags.accept_defaults;

    let mut state = if prompting {
        PromptState::SelectScope
    } else {
        PromptState::Done
    };
    while state != PromptState::Done {
        let current = scope.unwrap_or_default();
        match state {
            PromptState::SelectScope if scope.is_none() => {
                scope = Some(select_scope(&mut *prompter)?);
            }
            PromptState::SelectPlatforms if platforms.is_none() => {
                let initial = PlatformId::ALL
                    .iter()
                    .position(|id| *id == env.default_platform);
                let chosen = select_many(
                    &mut *prompter,
                    "Which platforms should skills be installed into?",
                    &PlatformId::ALL,
                    Selection::with_chosen(PlatformId::ALL.len(), initial),
                )?;
                platforms = Some(chosen.into_iter().map(|index| PlatformId::ALL[index]).collect());
            }
            PromptState::SelectPackages if packages.is_none() => {
                let names = catalog
                    .iter()
                    .map(|package| package.name.as_str())
                    .collect::<Vec<_>>();
                let chosen = select_many(
                    &mut *prompter,
                    "Which skills should be installed?",
                    &names,
                    Selection::new(names.len()),
                )?;
                packages = Some(chosen.into_iter().map(|index| catalog[index].clone()).collect());
            }
            PromptState::ConfirmCompanionCommands if commands.is_none() => {
                let supported = platforms
                    .iter()
                    .flatten()
                    .any(|id| id.descriptor().supports_commands(current));
                if supported {
                    commands = Some(prompter.confirm("Install companion commands?", false)?);
                } else {
                    debug!("skip {state:?}, no selected platform takes commands");
                }
            }
            PromptState::ConfirmIgnoreFile if gitignore.is_none() => {
                if current == Scope::Local {
                    gitignore =
                        Some(prompter.confirm("Add installed skills to .gitignore?", false)?);
                } else {
                    debug!("skip {state:?}, scope is global");
                }
            }
            _ => debug!("skip {state:?}, resolved by flag"),
        }
        state = state.next();
    }

    let scope = scope.unwrap_or_default();
    let platforms = match platforms {
        Some(platforms) if !platforms.is_empty() => platforms,
        _ => vec![env.default_platform],
    };
    let packages = match packages {
        Some(packages) if !packages.is_empty() => packages,
        _ => catalog.to_vec(),
    };

    let plan = InstallPlan {
        scope,
        platforms: platforms.into_iter().map(PlatformId::descriptor).collect(),
        packages,
        install_companion_commands: commands.unwrap_or(false),
        update_ignore_file: scope == Scope::Local && gitignore.unwrap_or(false),
        self_install: flags.self_install,
    };
    debug!("resolved plan: {plan:?}");

    Ok(plan)
}

/// Option resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum OptionError {
    /// Flags contradict each other.
    #[error("contradictory options: {0}")]
    Contradiction(String),

    /// Non-interactive run leaves required axes unresolved.
    #[error("not running in a terminal, so these must be given as flags (or pass --yes): {missing}")]
    Underspecified { missing: String },

    /// Named skill does not exist in catalog.
    #[error("unknown skill {0:?}")]
    UnknownPackage(String),

    /// Installer working tree cannot be located for `--self`.
    #[error("cannot determine installer location for --self, run it from a local checkout")]
    SelfLocationUnknown,

    /// Interactive prompt fails or gets cancelled.
    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),

    /// Default catalog location cannot be determined.
    #[error(transparent)]
    Path(#[from] crate::path::PathError),
}

/// Friendly result alias :3
pub type Result<T, E = OptionError> = std::result::Result<T, E>;
