// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Skill synchronization.
//!
//! Materialize every (platform, skill) pair of an [`InstallPlan`] on the file
//! system. Pairs are processed one after another in plan order. Each pair is
//! isolated: its failure is recorded in its own [`SyncResult`] and the
//! remaining pairs still run.
//!
//! # Install Semantics
//!
//! Installs always overwrite. Whatever sits at the target path is removed
//! first, then the skill is copied over in full. Running the same plan twice
//! therefore leaves the exact same tree behind, with no stale files from an
//! earlier install. Before anything is removed or written, the target goes
//! through the [`Guardrail`].
//!
//! # Manifest Normalization
//!
//! Skills may spell their manifest "Skill.md" or similar. After copying, a
//! non-canonical manifest is renamed to "SKILL.md", unless a canonical one is
//! already there. On case-insensitive file systems both names may refer to
//! the same file, so normalization only ever renames and never deletes.

pub mod command;
pub mod guard;

use crate::{
    catalog::{is_manifest_name, PackageDescriptor, MANIFEST_FILE},
    path::PathResolver,
    plan::InstallPlan,
    platform::{PlatformDescriptor, PlatformId},
    sync::{
        command::{command_target, find_command_source, render},
        guard::{check_disjoint, Guardrail, GuardrailRejection},
    },
};

use ignore::WalkBuilder;
use std::{
    error::Error as StdError,
    fs::{
        copy, create_dir, create_dir_all, read_dir, read_to_string, remove_dir_all, remove_file,
        rename, write,
    },
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// One (platform, skill) pair of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOperation {
    pub platform: PlatformId,
    pub package: String,
    pub target_package_path: PathBuf,

    /// Where the companion command was written, if one was installed.
    pub target_command_path: Option<PathBuf>,
    pub result: SyncResult,
}

/// Outcome of a single pair.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub success: bool,
    pub command_installed: bool,
    pub error: Option<String>,
}

/// Executes install plans.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    resolver: PathResolver,
    guardrail: Guardrail,
}

impl SyncEngine {
    /// Construct new sync engine.
    pub fn new(resolver: PathResolver) -> Self {
        let guardrail = Guardrail::new(&resolver);
        Self {
            resolver,
            guardrail,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Execute every pair of a plan, platforms first, then skills.
    ///
    /// Never fails as a whole. Errors are recorded per pair.
    pub fn execute(&self, plan: &InstallPlan) -> Vec<SyncOperation> {
        plan.platforms()
            .iter()
            .flat_map(|platform| {
                plan.packages()
                    .iter()
                    .map(move |package| self.sync_pair(plan, platform, package))
            })
            .collect()
    }

    #[instrument(skip(self, plan, platform, package), fields(platform = platform.name, package = %package.name), level = "debug")]
    fn sync_pair(
        &self,
        plan: &InstallPlan,
        platform: &PlatformDescriptor,
        package: &PackageDescriptor,
    ) -> SyncOperation {
        let target_package_path = self
            .resolver
            .package_root(platform, plan.scope())
            .join(&package.name);
        let target_command_path = (plan.install_companion_commands()
            && package.has_companion_command)
            .then(|| self.resolver.command_root(platform, plan.scope()))
            .flatten()
            .map(|root| command_target(&root, &package.name, platform.command_extension));

        let result = match self.install(
            platform,
            package,
            &target_package_path,
            target_command_path.as_deref(),
        ) {
            Ok(command_installed) => {
                info!(
                    "installed {} into {} at {:?}",
                    package.name,
                    platform.name,
                    target_package_path.display()
                );
                SyncResult {
                    success: true,
                    command_installed,
                    error: None,
                }
            }
            Err(err) => {
                let message = error_chain(&err);
                warn!("failed to install {} into {}: {message}", package.name, platform.name);
                SyncResult {
                    success: false,
                    command_installed: false,
                    error: Some(message),
                }
            }
        };

        SyncOperation {
            platform: platform.id,
            package: package.name.clone(),
            target_package_path,
            target_command_path: target_command_path.filter(|_| result.command_installed),
            result,
        }
    }

    fn install(
        &self,
        platform: &PlatformDescriptor,
        package: &PackageDescriptor,
        target: &Path,
        command: Option<&Path>,
    ) -> Result<bool> {
        self.guardrail.validate(target, &package.name)?;
        check_disjoint(target, &package.source_path)?;

        if let Some(parent) = target.parent() {
            mkdirp::mkdirp(parent).map_err(|err| SyncError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        // INVARIANT: Latest install wins, nothing from a previous install survives.
        remove_existing(target)?;
        create_dir(target).map_err(|err| SyncError::CreateDir {
            source: err,
            path: target.to_path_buf(),
        })?;
        copy_tree(&package.source_path, target)?;
        normalize_manifest(target)?;

        match command {
            Some(command) => self.install_command(platform, package, target, command),
            None => {
                if package.has_companion_command {
                    debug!("{} takes no companion commands here", platform.name);
                }
                Ok(false)
            }
        }
    }

    fn install_command(
        &self,
        platform: &PlatformDescriptor,
        package: &PackageDescriptor,
        installed: &Path,
        target: &Path,
    ) -> Result<bool> {
        let Some(source) = find_command_source(package, platform.command_extension) else {
            debug!(
                "{} has no {} command template",
                package.name, platform.command_extension
            );
            return Ok(false);
        };

        self.guardrail.validate(target, &package.name)?;
        if let Some(parent) = target.parent() {
            mkdirp::mkdirp(parent).map_err(|err| SyncError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        let template = read_to_string(&source).map_err(|err| SyncError::ReadCommand {
            source: err,
            path: source.clone(),
        })?;
        let content = if platform.interpolate_command {
            render(&template, installed)
        } else {
            template
        };
        write(target, content).map_err(|err| SyncError::WriteCommand {
            source: err,
            path: target.to_path_buf(),
        })?;
        info!("installed command {:?}", target.display());

        Ok(true)
    }
}

fn remove_existing(target: &Path) -> Result<()> {
    let Ok(metadata) = target.symlink_metadata() else {
        return Ok(());
    };

    let removal = if metadata.is_dir() {
        remove_dir_all(target)
    } else {
        remove_file(target)
    };
    removal.map_err(|err| SyncError::Remove {
        source: err,
        path: target.to_path_buf(),
    })
}

/// Copy every entry of a directory tree, including hidden and ignored files.
fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(true)
        .build();

    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let dest = target.join(relative);
        let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());
        if is_dir {
            create_dir_all(&dest).map_err(|err| SyncError::CreateDir {
                source: err,
                path: dest.clone(),
            })?;
        } else {
            copy(entry.path(), &dest).map_err(|err| SyncError::Copy {
                source: err,
                from: entry.path().to_path_buf(),
                to: dest.clone(),
            })?;
        }
    }

    Ok(())
}

/// Rename a non-canonical manifest to its canonical name.
///
/// No-op if the canonical name is already listed in the directory.
fn normalize_manifest(dir: &Path) -> Result<()> {
    let mut names = read_dir(dir)
        .map_err(|err| SyncError::ListDir {
            source: err,
            path: dir.to_path_buf(),
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .collect::<Vec<_>>();
    names.sort();

    if names.iter().any(|name| name == MANIFEST_FILE) {
        return Ok(());
    }

    if let Some(name) = names.iter().find(|name| is_manifest_name(name)) {
        let from = dir.join(name);
        let to = dir.join(MANIFEST_FILE);
        debug!("rename {:?} to {MANIFEST_FILE}", name);
        rename(&from, &to).map_err(|err| SyncError::Rename {
            source: err,
            from,
            to,
        })?;
    }

    Ok(())
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}

/// Per-pair sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Target failed a safety check.
    #[error(transparent)]
    Guardrail(#[from] GuardrailRejection),

    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to remove previous install at {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    #[error("failed to list {:?}", path.display())]
    ListDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to rename {:?} to {:?}", from.display(), to.display())]
    Rename {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    #[error("failed to read command template {:?}", path.display())]
    ReadCommand {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to write command file {:?}", path.display())]
    WriteCommand {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Skill tree cannot be walked.
    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

/// Friendly result alias :3
type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::COMMANDS_DIR, platform::Scope};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    struct Fixture {
        root: PathBuf,
        engine: SyncEngine,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            let root = std::env::current_dir()?;
            create_dir_all(root.join("home"))?;
            create_dir_all(root.join("project"))?;
            let resolver = PathResolver::new(root.join("home"), root.join("project"))?;

            Ok(Self {
                engine: SyncEngine::new(resolver),
                root,
            })
        }

        fn skill(&self, name: &str, files: &[(&str, &str)]) -> anyhow::Result<PackageDescriptor> {
            let dir = self.root.join("catalog").join(name);
            for (path, content) in files {
                let path = dir.join(path);
                if let Some(parent) = path.parent() {
                    create_dir_all(parent)?;
                }
                write(path, content)?;
            }

            Ok(PackageDescriptor {
                name: name.into(),
                has_companion_command: dir.join(COMMANDS_DIR).is_dir(),
                source_path: dir,
            })
        }

        fn plan(
            &self,
            scope: Scope,
            platforms: &[PlatformId],
            packages: Vec<PackageDescriptor>,
            commands: bool,
        ) -> InstallPlan {
            InstallPlan {
                scope,
                platforms: platforms.iter().map(|id| id.descriptor()).collect(),
                packages,
                install_companion_commands: commands,
                update_ignore_file: false,
                self_install: false,
            }
        }
    }

    fn listing(dir: &Path) -> anyhow::Result<Vec<(String, String)>> {
        let mut files = Vec::new();
        for entry in WalkBuilder::new(dir).standard_filters(false).build() {
            let entry = entry?;
            if entry.path().is_file() {
                let relative = entry.path().strip_prefix(dir)?.to_string_lossy().into_owned();
                files.push((relative, read_to_string(entry.path())?));
            }
        }
        files.sort();

        Ok(files)
    }

    #[sealed_test]
    fn install_single_pair() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill("alpha", &[("SKILL.md", "# alpha"), ("docs/usage.md", "use it")])?;
        let beta = fixture.skill("beta", &[("SKILL.md", "# beta")])?;
        let plan = fixture.plan(Scope::Local, &[PlatformId::OpenCode], vec![alpha], false);

        let result = fixture.engine.execute(&plan);
        assert_eq!(result.len(), 1);

        let op = &result[0];
        let target = fixture.root.join("project/.opencode/skills/alpha");
        assert_eq!(op.target_package_path, target);
        assert_eq!(op.target_command_path, None);
        assert_eq!(
            op.result,
            SyncResult {
                success: true,
                command_installed: false,
                error: None
            }
        );
        assert_eq!(
            listing(&target)?,
            vec![
                ("SKILL.md".to_string(), "# alpha".to_string()),
                ("docs/usage.md".to_string(), "use it".to_string()),
            ]
        );
        assert!(!target.with_file_name(beta.name).exists());

        Ok(())
    }

    #[sealed_test]
    fn reinstall_drops_stale_files() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill("alpha", &[("SKILL.md", "# alpha"), (".hidden", "dot")])?;
        let plan = fixture.plan(Scope::Global, &[PlatformId::Claude], vec![alpha], false);

        fixture.engine.execute(&plan);
        let target = fixture.root.join("home/.claude/skills/alpha");
        let first = listing(&target)?;
        write(target.join("stale.md"), "left behind")?;

        let result = fixture.engine.execute(&plan);
        assert!(result[0].result.success);
        assert_eq!(listing(&target)?, first);
        assert!(first.iter().any(|(name, _)| name == ".hidden"));

        Ok(())
    }

    #[sealed_test]
    fn manifest_gets_canonical_name() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill("alpha", &[("Skill.md", "# alpha")])?;
        let plan = fixture.plan(Scope::Local, &[PlatformId::Claude], vec![alpha], false);

        fixture.engine.execute(&plan);
        let target = fixture.root.join("project/.claude/skills/alpha");
        let names = read_dir(&target)?
            .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        assert_eq!(names, vec!["SKILL.md".to_string()]);
        assert_eq!(read_to_string(target.join(MANIFEST_FILE))?, "# alpha");

        Ok(())
    }

    #[sealed_test]
    fn normalization_keeps_both_manifests() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill("alpha", &[("SKILL.md", "canonical"), ("Skill.md", "other")])?;
        let plan = fixture.plan(Scope::Local, &[PlatformId::Claude], vec![alpha], false);

        let result = fixture.engine.execute(&plan);
        assert!(result[0].result.success);

        let target = fixture.root.join("project/.claude/skills/alpha");
        let files = listing(&target)?;
        assert!(files.contains(&("SKILL.md".to_string(), "canonical".to_string())));
        if files.len() == 2 {
            // Case-sensitive file system, both files are distinct.
            assert!(files.contains(&("Skill.md".to_string(), "other".to_string())));
        }

        Ok(())
    }

    #[sealed_test]
    fn command_installed_with_interpolation() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill(
            "alpha",
            &[
                ("SKILL.md", "# alpha"),
                ("commands/alpha.md", "Read {{SKILL_PATH}}/SKILL.md"),
                ("commands/alpha.toml", "prompt = \"{{SKILL_PATH}}\""),
            ],
        )?;
        let plan = fixture.plan(
            Scope::Local,
            &[PlatformId::OpenCode, PlatformId::Gemini],
            vec![alpha],
            true,
        );

        let result = fixture.engine.execute(&plan);
        assert!(result.iter().all(|op| op.result.success && op.result.command_installed));

        let skill = fixture.root.join("project/.opencode/skills/alpha");
        let command = fixture.root.join("project/.opencode/command/alpha.md");
        assert_eq!(result[0].target_command_path, Some(command.clone()));
        assert_eq!(
            read_to_string(command)?,
            format!("Read {}/SKILL.md", skill.display())
        );

        let skill = fixture.root.join("project/.gemini/skills/alpha");
        let command = fixture.root.join("project/.gemini/commands/alpha.toml");
        assert_eq!(
            read_to_string(command)?,
            format!("prompt = \"{}\"", skill.display())
        );

        Ok(())
    }

    #[sealed_test]
    fn command_copied_verbatim_without_interpolation() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let template = indoc! {"
            ---
            description: alpha
            ---
            Use {{SKILL_PATH}}.
        "};
        let alpha = fixture.skill(
            "alpha",
            &[("SKILL.md", "# alpha"), ("commands/alpha.md", template)],
        )?;
        let plan = fixture.plan(Scope::Global, &[PlatformId::Codex], vec![alpha], true);

        let result = fixture.engine.execute(&plan);
        assert!(result[0].result.command_installed);
        assert_eq!(
            read_to_string(fixture.root.join("home/.codex/prompts/alpha.md"))?,
            template
        );

        Ok(())
    }

    #[sealed_test]
    fn platform_without_command_root_skips_command() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill(
            "alpha",
            &[("SKILL.md", "# alpha"), ("commands/alpha.md", "cmd")],
        )?;
        let plan = fixture.plan(Scope::Global, &[PlatformId::Claude], vec![alpha], true);

        let result = fixture.engine.execute(&plan);
        assert_eq!(
            result[0].result,
            SyncResult {
                success: true,
                command_installed: false,
                error: None
            }
        );
        assert_eq!(result[0].target_command_path, None);

        Ok(())
    }

    #[sealed_test]
    fn missing_command_format_is_not_an_error() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill(
            "alpha",
            &[("SKILL.md", "# alpha"), ("commands/alpha.md", "cmd")],
        )?;
        let plan = fixture.plan(Scope::Global, &[PlatformId::Gemini], vec![alpha], true);

        let result = fixture.engine.execute(&plan);
        assert!(result[0].result.success);
        assert!(!result[0].result.command_installed);
        assert!(!fixture.root.join("home/.gemini/commands/alpha.toml").exists());
        assert_eq!(result[0].target_command_path, None);

        Ok(())
    }

    #[sealed_test]
    fn catalog_inside_platform_root_is_left_intact() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let skills = fixture.root.join("project/.claude/skills");
        create_dir_all(skills.join("alpha"))?;
        write(skills.join("alpha/SKILL.md"), "# alpha")?;
        let alpha = PackageDescriptor {
            name: "alpha".into(),
            source_path: skills.join("alpha"),
            has_companion_command: false,
        };
        let plan = fixture.plan(
            Scope::Local,
            &[PlatformId::Claude, PlatformId::OpenCode],
            vec![alpha],
            false,
        );

        let result = fixture.engine.execute(&plan);
        assert!(!result[0].result.success);
        assert!(result[0]
            .result
            .error
            .as_deref()
            .is_some_and(|err| err.contains("overlaps skill source")));
        assert_eq!(read_to_string(skills.join("alpha/SKILL.md"))?, "# alpha");

        assert!(result[1].result.success);
        assert_eq!(
            read_to_string(fixture.root.join("project/.opencode/skills/alpha/SKILL.md"))?,
            "# alpha"
        );

        Ok(())
    }

    #[sealed_test]
    fn failing_pair_does_not_stop_others() -> anyhow::Result<()> {
        let fixture = Fixture::new()?;
        let alpha = fixture.skill("alpha", &[("SKILL.md", "# alpha")])?;
        let mut sneaky = fixture.skill("sneaky", &[("SKILL.md", "# sneaky")])?;
        sneaky.name = "..".into();
        let mut missing = fixture.skill("missing", &[("SKILL.md", "# missing")])?;
        missing.source_path = fixture.root.join("catalog/nowhere");
        let plan = fixture.plan(
            Scope::Local,
            &[PlatformId::Claude, PlatformId::Codex],
            vec![sneaky, missing, alpha],
            false,
        );

        let result = fixture.engine.execute(&plan);
        let outcomes = result
            .iter()
            .map(|op| (op.platform, op.package.as_str(), op.result.success))
            .collect::<Vec<_>>();
        assert_eq!(
            outcomes,
            vec![
                (PlatformId::Claude, "..", false),
                (PlatformId::Claude, "missing", false),
                (PlatformId::Claude, "alpha", true),
                (PlatformId::Codex, "..", false),
                (PlatformId::Codex, "missing", false),
                (PlatformId::Codex, "alpha", true),
            ]
        );
        assert!(result[0].result.error.as_deref().is_some_and(|err| err.contains("unsafe")));
        assert!(fixture.root.join("project/.codex/skills/alpha/SKILL.md").is_file());

        // INVARIANT: Rejected pair never touched anything outside its root.
        assert!(fixture.root.join("project").is_dir());

        Ok(())
    }
}
