// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where skills and companion commands land for any given
//! platform and scope, along with the handful of user directories the
//! installer itself relies on.

use crate::platform::{PlatformDescriptor, PlatformId, Scope};

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Determine default absolute path to installer configuration file.
///
/// Uses `$XDG_CONFIG_HOME/skillsync/config.toml`. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("skillsync").join("config.toml"))
        .ok_or(PathError::NoWayHome)
}

/// Determine default absolute path for fetched catalog checkouts.
///
/// Uses `$XDG_CACHE_HOME/skillsync/catalog`.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn default_catalog_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|path| path.join("skillsync").join("catalog"))
        .ok_or(PathError::NoWayHome)
}

/// Map platform and scope pairs to concrete locations.
///
/// Global templates have their `~` expanded against the home directory this
/// resolver was built with. Local templates are joined onto the working
/// directory and never touch the home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    home: PathBuf,
    cwd: PathBuf,
}

impl PathResolver {
    /// Construct new path resolver from explicit home and working directory.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::NonUtf8Home`] if the home directory is not valid
    ///   UTF-8, because templates could not be expanded against it.
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();
        if home.to_str().is_none() {
            return Err(PathError::NonUtf8Home { home });
        }

        Ok(Self {
            home,
            cwd: cwd.into(),
        })
    }

    /// Construct path resolver from current process environment.
    ///
    /// # Errors
    ///
    /// - Return [`PathError::NoWayHome`] if home directory is unknown.
    /// - Return [`PathError::CurrentDir`] if working directory is unreadable.
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(PathError::CurrentDir)?;
        Self::new(home_dir()?, cwd)
    }

    pub fn home(&self) -> &Path {
        self.home.as_path()
    }

    pub fn cwd(&self) -> &Path {
        self.cwd.as_path()
    }

    /// Root directory that holds every skill of a platform in given scope.
    pub fn package_root(&self, platform: &PlatformDescriptor, scope: Scope) -> PathBuf {
        self.expand(platform.package_root_template(scope), scope)
    }

    /// Root directory for companion commands, if the platform has one.
    ///
    /// Absence means the platform does not take companion commands in this
    /// scope. It is not an error.
    pub fn command_root(&self, platform: &PlatformDescriptor, scope: Scope) -> Option<PathBuf> {
        platform
            .command_root_template(scope)
            .map(|template| self.expand(template, scope))
    }

    /// Every package and command root of every platform in both scopes.
    pub fn known_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        for id in PlatformId::ALL {
            let platform = id.descriptor();
            for scope in [Scope::Global, Scope::Local] {
                roots.push(self.package_root(platform, scope));
                roots.extend(self.command_root(platform, scope));
            }
        }

        roots
    }

    fn expand(&self, template: &str, scope: Scope) -> PathBuf {
        match scope {
            Scope::Global => {
                // INVARIANT: Home is valid UTF-8, checked at construction.
                let expanded = shellexpand::tilde_with_context(template, || self.home.to_str());
                PathBuf::from(expanded.into_owned())
            }
            Scope::Local => self.cwd.join(template),
        }
    }
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's home directory.
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Home directory cannot be used for template expansion.
    #[error("home directory {:?} is not valid UTF-8", home.display())]
    NonUtf8Home { home: PathBuf },

    /// Working directory cannot be determined.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
