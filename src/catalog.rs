// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Skill catalog discovery.
//!
//! A __catalog__ is a directory tree that holds installable skills. Every
//! skill is a self-contained directory under `skills/` at the top-level of
//! the catalog. The directory name is the skill's name.
//!
//! # Skill Layout
//!
//! A directory only counts as a skill if it contains a manifest file named
//! "SKILL.md". The name is matched without regard to ASCII case, so a
//! "Skill.md" is just as good. Skills may also carry a "commands/"
//! directory, which holds platform-specific companion command templates.
//! The content of a skill is opaque otherwise. Nothing in here reads it.
//!
//! # Catalog Sources
//!
//! The catalog can come from three places: the working tree that the
//! installer itself runs from, an explicit local directory, or a remote
//! repository that gets cloned into a cache directory first. See
//! [`CatalogSource`].

pub mod fetch;

use crate::{
    path::{home_dir, PathError},
    sync::guard::GuardrailRejection,
};

use std::{
    ffi::OsStr,
    fs::read_dir,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Canonical name of the skill manifest file.
pub const MANIFEST_FILE: &str = "SKILL.md";

/// Directory under the catalog root that holds skills.
pub const SKILLS_DIR: &str = "skills";

/// Directory inside a skill that holds companion command templates.
pub const COMMANDS_DIR: &str = "commands";

/// Installable skill found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Unique name, same as the skill's directory name.
    pub name: String,

    /// Absolute path to the skill's content root.
    pub source_path: PathBuf,

    /// Skill carries a "commands/" directory.
    pub has_companion_command: bool,
}

/// Check if file name is a manifest file name in any ASCII casing.
pub fn is_manifest_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|name| name.eq_ignore_ascii_case(MANIFEST_FILE))
}

/// Discover every skill in a directory.
///
/// Scans the immediate subdirectories of `skills_dir` for a manifest file.
/// Results are sorted by name. A missing or unreadable directory yields an
/// empty listing, leaving the caller to decide whether that is fatal.
#[instrument(skip(skills_dir), level = "debug")]
pub fn discover(skills_dir: impl AsRef<Path>) -> Vec<PackageDescriptor> {
    let skills_dir = skills_dir.as_ref();
    let skills_dir = std::path::absolute(skills_dir).unwrap_or_else(|_| skills_dir.to_path_buf());
    let entries = match read_dir(&skills_dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("cannot read catalog at {:?}: {err}", skills_dir.display());
            return Vec::new();
        }
    };

    let mut packages = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_str()?.to_owned();
            if !has_manifest(&path) {
                debug!("skip {name:?}, no {MANIFEST_FILE} found");
                return None;
            }

            Some(PackageDescriptor {
                name,
                has_companion_command: path.join(COMMANDS_DIR).is_dir(),
                source_path: path,
            })
        })
        .collect::<Vec<_>>();
    packages.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));

    info!(
        "found {} skills in {:?}",
        packages.len(),
        skills_dir.display()
    );

    packages
}

fn has_manifest(dir: &Path) -> bool {
    read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .any(|entry| entry.path().is_file() && is_manifest_name(&entry.file_name()))
        })
        .unwrap_or(false)
}

/// Where the catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Working tree the installer runs from.
    SelfTree(PathBuf),

    /// Explicit local catalog checkout.
    Local(PathBuf),

    /// Remote repository to clone into a cache directory.
    Remote {
        url: String,
        branch: Option<String>,
        cache_dir: PathBuf,
    },
}

impl CatalogSource {
    /// Produce a local catalog root for this source.
    ///
    /// Local sources are used as-is. Remote sources get cloned first, with a
    /// progress bar drawn while the transfer happens.
    ///
    /// # Errors
    ///
    /// - Return [`CatalogError::Fetch`] if remote acquisition fails.
    /// - Return [`CatalogError::UnsafeCache`] if the cache directory is
    ///   protected.
    /// - Return [`CatalogError::Join`] if the fetch task dies.
    pub async fn materialize(self) -> Result<PathBuf> {
        match self {
            Self::SelfTree(path) | Self::Local(path) => Ok(path),
            Self::Remote {
                url,
                branch,
                cache_dir,
            } => {
                let home = home_dir()?;
                tokio::task::spawn_blocking(move || {
                    fetch::fetch_catalog(&url, branch.as_deref(), &cache_dir, &home)
                })
                .await?
            }
        }
    }

    /// Check if source is the installer's own working tree.
    pub fn is_self_tree(&self) -> bool {
        matches!(self, Self::SelfTree(_))
    }
}

/// Locate the working tree that an executable was built from.
///
/// Walks up from the executable's location to the first ancestor that has a
/// skills directory.
pub fn locate_self_tree(executable: impl AsRef<Path>) -> Option<PathBuf> {
    executable
        .as_ref()
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(SKILLS_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Catalog error types.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No skill could be found at the catalog source.
    #[error("no skills found in catalog at {:?}", root.display())]
    Empty { root: PathBuf },

    /// Remote catalog acquisition fails.
    #[error("failed to fetch catalog from {url}")]
    Fetch {
        #[source]
        source: git2::Error,
        url: String,
    },

    /// Previous catalog checkout cannot be cleared, or its parent created.
    #[error("failed to prepare catalog cache at {:?}", path.display())]
    Cache {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Cache directory is, or contains, a protected root.
    #[error("refusing to use catalog cache")]
    UnsafeCache(#[from] GuardrailRejection),

    /// Home directory cannot be determined.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Background fetch task fails to complete.
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

/// Friendly result alias :3
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::{create_dir_all, write};

    fn make_skill(root: &Path, name: &str, manifest: &str, commands: bool) -> anyhow::Result<()> {
        let dir = root.join(name);
        create_dir_all(&dir)?;
        write(dir.join(manifest), format!("# {name}\n"))?;
        if commands {
            create_dir_all(dir.join(COMMANDS_DIR))?;
        }

        Ok(())
    }

    #[sealed_test]
    fn discover_sorted_skills() -> anyhow::Result<()> {
        let root = std::env::current_dir()?.join(SKILLS_DIR);
        make_skill(&root, "beta", "SKILL.md", false)?;
        make_skill(&root, "alpha", "Skill.md", true)?;
        make_skill(&root, "gamma", "skill.md", false)?;

        let result = discover(&root)
            .into_iter()
            .map(|package| (package.name, package.has_companion_command))
            .collect::<Vec<_>>();
        let expect = vec![
            ("alpha".to_string(), true),
            ("beta".to_string(), false),
            ("gamma".to_string(), false),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test]
    fn discover_skips_non_skills() -> anyhow::Result<()> {
        let root = std::env::current_dir()?.join(SKILLS_DIR);
        make_skill(&root, "alpha", "SKILL.md", false)?;
        make_skill(&root, "notes", "README.md", false)?;
        write(root.join("SKILL.md"), "stray file")?;

        // A directory named like the manifest is not a manifest.
        create_dir_all(root.join("hollow").join("SKILL.md"))?;

        let result = discover(&root)
            .into_iter()
            .map(|package| package.name)
            .collect::<Vec<_>>();
        assert_eq!(result, vec!["alpha".to_string()]);

        Ok(())
    }

    #[sealed_test]
    fn discover_missing_root_is_empty() -> anyhow::Result<()> {
        assert_eq!(discover("nowhere"), Vec::new());
        Ok(())
    }

    #[sealed_test]
    fn discover_yields_absolute_source_paths() -> anyhow::Result<()> {
        make_skill(Path::new(SKILLS_DIR), "alpha", "SKILL.md", false)?;

        let result = discover(SKILLS_DIR);
        assert_eq!(result.len(), 1);
        assert!(result[0].source_path.is_absolute());
        assert!(result[0].source_path.ends_with("skills/alpha"));

        Ok(())
    }

    #[sealed_test]
    fn locate_self_tree_walks_up() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        create_dir_all(root.join(SKILLS_DIR))?;
        create_dir_all(root.join("target").join("release"))?;

        let exe = root.join("target").join("release").join("skillsync");
        assert_eq!(locate_self_tree(&exe), Some(root.clone()));

        Ok(())
    }

    #[test]
    fn manifest_name_ignores_ascii_case() {
        assert!(is_manifest_name(OsStr::new("SKILL.md")));
        assert!(is_manifest_name(OsStr::new("Skill.md")));
        assert!(is_manifest_name(OsStr::new("skill.MD")));
        assert!(!is_manifest_name(OsStr::new("SKILLS.md")));
    }
}
