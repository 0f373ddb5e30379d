// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use skillsync::{
    catalog::{discover, CatalogError, SKILLS_DIR},
    config::{InstallerConfig, CONFIG_ENV},
    path::{default_config_file, PathResolver},
    plan::{check_required, prompt::InquirePrompter, resolve, resolve_source, Environment, RawFlags},
    platform::{PlatformId, Scope},
    report::{
        gitignore::{ignore_entries, update_ignore_file, IgnoreOutcome},
        Summary,
    },
    sync::SyncEngine,
};

use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    long_about = "Install skills from a catalog into the skill directories of AI coding assistants.\n\n\
                  Options that are not given as flags are asked for when running in a terminal.",
    override_usage = "skillsync [options]",
    version
)]
struct Cli {
    /// Install into the home directory.
    #[arg(short, long, overrides_with = "local", help_heading = "Scope")]
    pub global: bool,

    /// Install into the current project.
    #[arg(short, long, overrides_with = "global", help_heading = "Scope")]
    pub local: bool,

    /// Use the working tree the installer runs from as catalog.
    #[arg(long = "self", help_heading = "Catalog")]
    pub self_install: bool,

    /// Use a local directory as catalog.
    #[arg(long, value_name = "path", help_heading = "Catalog")]
    pub source: Option<PathBuf>,

    /// Install into Claude Code.
    #[arg(long, help_heading = "Platforms")]
    pub claude: bool,

    /// Install into OpenCode.
    #[arg(long, help_heading = "Platforms")]
    pub opencode: bool,

    /// Install into Gemini CLI.
    #[arg(long, help_heading = "Platforms")]
    pub gemini: bool,

    /// Install into Codex.
    #[arg(long, help_heading = "Platforms")]
    pub codex: bool,

    /// Name of skill to install, can be given more than once.
    #[arg(short, long = "skill", value_name = "name", help_heading = "Skills")]
    pub skills: Vec<String>,

    /// Install every skill in the catalog.
    #[arg(short, long, help_heading = "Skills")]
    pub all: bool,

    /// Install companion commands of selected skills.
    #[arg(long, overrides_with = "no_commands")]
    pub commands: bool,

    /// Skip companion commands.
    #[arg(long, overrides_with = "commands")]
    pub no_commands: bool,

    /// Add local skill directories to the project's .gitignore.
    #[arg(long, overrides_with = "no_gitignore")]
    pub gitignore: bool,

    /// Leave the project's .gitignore alone.
    #[arg(long, overrides_with = "gitignore")]
    pub no_gitignore: bool,

    /// Accept defaults for everything not given as a flag.
    #[arg(short, long)]
    pub yes: bool,

    /// Exit with failure if any skill fails to install.
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    fn flags(&self) -> RawFlags {
        let scope = if self.local {
            Some(Scope::Local)
        } else if self.global {
            Some(Scope::Global)
        } else {
            None
        };

        let platforms = [
            (self.claude, PlatformId::Claude),
            (self.opencode, PlatformId::OpenCode),
            (self.gemini, PlatformId::Gemini),
            (self.codex, PlatformId::Codex),
        ]
        .into_iter()
        .filter_map(|(given, id)| given.then_some(id))
        .collect();

        RawFlags {
            scope,
            self_install: self.self_install,
            source: self.source.clone(),
            platforms,
            packages: self.skills.clone(),
            all_packages: self.all,
            commands: tristate(self.commands, self.no_commands),
            gitignore: tristate(self.gitignore, self.no_gitignore),
            accept_defaults: self.yes,
        }
    }
}

fn tristate(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    match run().await {
        Ok(true) => exit(0),
        Ok(false) => exit(1),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

/// Run the installer, returning whether the run counts as clean.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    let flags = cli.flags();

    let config_path = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => default_config_file()?,
    };
    let config = InstallerConfig::load(config_path)?;
    let env = Environment::detect(&config);
    check_required(&flags, &env)?;

    let executable = std::env::current_exe().ok();
    let source = resolve_source(&flags, &config, executable.as_deref())?;
    if source.is_self_tree() {
        info!("install from installer working tree");
    }
    let root = source.materialize().await?;

    let skills_dir = root.join(SKILLS_DIR);
    let catalog = discover(&skills_dir);
    if catalog.is_empty() {
        return Err(CatalogError::Empty { root: skills_dir }.into());
    }

    let plan = resolve(&flags, &env, &catalog, &mut InquirePrompter)?;
    let engine = SyncEngine::new(PathResolver::from_env()?);
    let operations = engine.execute(&plan);

    if plan.update_ignore_file() {
        let entries = ignore_entries(plan.platforms().iter().copied());
        match update_ignore_file(engine.resolver().cwd(), &entries) {
            Ok(IgnoreOutcome::Updated(added)) => info!("ignore {}", added.join(", ")),
            Ok(IgnoreOutcome::Unchanged | IgnoreOutcome::Missing) => {}
            Err(err) => warn!("{err:?}"),
        }
    }

    let summary = Summary::new(&operations);
    println!("{summary}");

    Ok(is_clean(cli.strict, &summary))
}

/// Failed pairs only count against the run in strict mode.
fn is_clean(strict: bool, summary: &Summary) -> bool {
    !(strict && summary.has_failures())
}
