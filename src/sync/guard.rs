// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Guardrails for destructive file system operations.
//!
//! Every install removes whatever sits at its target path before copying a
//! skill over. A bad path here would wipe something the user cares about,
//! so each target is checked before anything gets deleted or written:
//!
//! - The skill name must be a plain path segment.
//! - The target must not be, or contain, a well-known system or home root.
//! - The target must lie strictly inside one of the platform roots known to
//!   the installer.
//! - The target must not overlap the skill it is installed from.
//!
//! Directories that get wiped outside of installs, like the catalog cache,
//! go through [`check_not_protected`] instead.

use crate::path::PathResolver;

use std::path::{Component, Path, PathBuf};

#[cfg(unix)]
const DENIED_ROOTS: &[&str] = &[
    "/",
    "/Applications",
    "/Library",
    "/System",
    "/Users",
    "/Volumes",
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/lib64",
    "/opt",
    "/private",
    "/proc",
    "/root",
    "/run",
    "/sbin",
    "/srv",
    "/sys",
    "/tmp",
    "/usr",
    "/var",
];

#[cfg(windows)]
const DENIED_ROOTS: &[&str] = &[
    "C:\\",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\ProgramData",
    "C:\\Users",
    "C:\\Windows",
];

#[cfg(not(any(unix, windows)))]
const DENIED_ROOTS: &[&str] = &["/"];

/// Validator for install targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guardrail {
    allowed_roots: Vec<PathBuf>,
    denied_roots: Vec<PathBuf>,
}

impl Guardrail {
    /// Construct new guardrail from every root the resolver knows about.
    ///
    /// The home directory of the resolver joins the system deny-list.
    pub fn new(resolver: &PathResolver) -> Self {
        let allowed_roots = resolver
            .known_roots()
            .iter()
            .map(|root| normalize(root))
            .collect();

        Self {
            allowed_roots,
            denied_roots: denied_roots(resolver.home()),
        }
    }

    /// Check that a target path is safe to delete or write.
    ///
    /// `name` is the skill name that was used to build the target.
    ///
    /// # Errors
    ///
    /// - Return [`GuardrailRejection`] describing the first failed check.
    pub fn validate(&self, candidate: &Path, name: &str) -> Result<()> {
        if candidate.as_os_str().is_empty() {
            return Err(GuardrailRejection::EmptyPath);
        }

        if !is_plain_segment(name) {
            return Err(GuardrailRejection::UnsafeName { name: name.into() });
        }

        let resolved = normalize(candidate);
        check_denied(&resolved, &self.denied_roots)?;

        let contained = self
            .allowed_roots
            .iter()
            .any(|root| resolved.starts_with(root) && resolved != *root);
        if !contained {
            return Err(GuardrailRejection::OutsideKnownRoots { path: resolved });
        }

        Ok(())
    }
}

/// Check that a directory is safe to wipe outside of an install.
///
/// Rejects the path if it is, or contains, a system root or `home`.
///
/// # Errors
///
/// - Return [`GuardrailRejection::EmptyPath`] for an empty path.
/// - Return [`GuardrailRejection::DeniedRoot`] for a protected path.
pub fn check_not_protected(path: &Path, home: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(GuardrailRejection::EmptyPath);
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    check_denied(&normalize(&absolute), &denied_roots(home))
}

/// Check that an install target and its skill source do not overlap.
///
/// Both paths are resolved through the file system when they exist, so
/// symlinked or relative spellings of the same directory are caught too.
///
/// # Errors
///
/// - Return [`GuardrailRejection::OverlapsSource`] if either path is equal
///   to, or inside of, the other.
pub fn check_disjoint(target: &Path, source: &Path) -> Result<()> {
    let target = resolve_existing(target);
    let source = resolve_existing(source);
    if target.starts_with(&source) || source.starts_with(&target) {
        return Err(GuardrailRejection::OverlapsSource {
            path: target,
            package_source: source,
        });
    }

    Ok(())
}

fn denied_roots(home: &Path) -> Vec<PathBuf> {
    let mut roots = DENIED_ROOTS.iter().map(PathBuf::from).collect::<Vec<_>>();
    roots.push(normalize(home));
    roots
}

fn check_denied(resolved: &Path, denied_roots: &[PathBuf]) -> Result<()> {
    match denied_roots.iter().find(|root| root.starts_with(resolved)) {
        Some(root) => Err(GuardrailRejection::DeniedRoot {
            path: resolved.to_path_buf(),
            root: root.clone(),
        }),
        None => Ok(()),
    }
}

fn resolve_existing(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .canonicalize()
        .unwrap_or_else(|_| normalize(&absolute))
}

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}

/// Resolve `.` and `..` segments without touching the file system.
///
/// Parent segments never climb above the root of an absolute path.
pub fn normalize(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() && !path.is_absolute() {
                    resolved.push("..");
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }

    resolved
}

/// Guardrail rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardrailRejection {
    /// Target path is empty.
    #[error("refusing to touch empty path")]
    EmptyPath,

    /// Skill name could escape its own directory.
    #[error("refusing unsafe skill name {name:?}")]
    UnsafeName { name: String },

    /// Target is, or contains, a protected root.
    #[error("refusing to touch {:?}, it would affect protected root {:?}", path.display(), root.display())]
    DeniedRoot { path: PathBuf, root: PathBuf },

    /// Target is, or sits inside, the skill it is installed from.
    #[error("refusing to touch {:?}, it overlaps skill source {:?}", path.display(), package_source.display())]
    OverlapsSource { path: PathBuf, package_source: PathBuf },

    /// Target is not inside any platform root.
    #[error("refusing to touch {:?}, it is outside of every platform root", path.display())]
    OutsideKnownRoots { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = GuardrailRejection> = std::result::Result<T, E>;
