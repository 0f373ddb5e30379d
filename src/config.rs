// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional installer configuration file, and how
//! to load it. The configuration only ever supplies defaults. Command-line
//! flags and prompt answers always take precedence over anything in here.

use crate::platform::PlatformId;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Default remote to fetch the skill catalog from.
pub const DEFAULT_CATALOG_URL: &str = "https://github.com/skillsync/skills.git";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV: &str = "SKILLSYNC_CONFIG";

/// Installer configuration layout.
///
/// # General Layout
///
/// The configuration is composed of two sections: catalog and defaults. The
/// catalog section details where skills are fetched from. The defaults
/// section replaces built-in defaults for option axes that were left
/// unresolved by flags and prompts.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct InstallerConfig {
    /// Where to fetch the skill catalog from.
    #[serde(default)]
    pub catalog: CatalogSettings,

    /// Fallback values for unresolved options.
    #[serde(default)]
    pub defaults: DefaultSettings,
}

impl InstallerConfig {
    /// Load configuration from target file.
    ///
    /// A missing file is not an error, it simply means that the built-in
    /// defaults apply.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(data) => {
                debug!("load configuration from {:?}", path.display());
                data.parse()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {:?}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Default platform to fall back to when none was chosen.
    pub fn default_platform(&self) -> PlatformId {
        self.defaults.platform.unwrap_or(PlatformId::Claude)
    }
}

impl FromStr for InstallerConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: InstallerConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on cache directory field.
        if let Some(cache_dir) = config.catalog.cache_dir.take() {
            config.catalog.cache_dir = Some(PathBuf::from(
                shellexpand::full(cache_dir.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(config)
    }
}

impl Display for InstallerConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Catalog source settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    /// Remote URL to clone the catalog from.
    pub url: String,

    /// Branch to check out instead of the remote's default branch.
    pub branch: Option<String>,

    /// Directory to keep the fetched catalog in.
    pub cache_dir: Option<PathBuf>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.into(),
            branch: None,
            cache_dir: None,
        }
    }
}

/// Fallback settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DefaultSettings {
    /// Platform to install into when none was chosen.
    pub platform: Option<PlatformId>,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Configuration file exists but cannot be read.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
