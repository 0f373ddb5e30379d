// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote catalog acquisition.
//!
//! Clone a remote skill catalog into a local cache directory. Any previous
//! checkout in that directory is thrown away first, so the catalog is always
//! the latest state of the remote.

use crate::{
    catalog::{CatalogError, Result},
    sync::guard::check_not_protected,
};

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    fs::remove_dir_all,
    path::{Path, PathBuf},
    time,
};
use tracing::{info, instrument};

/// Clone remote catalog into cache directory.
///
/// The progress of the clone is displayed through a progress bar. If the
/// remote requires credentials, then the user will be prompted for them and
/// the progress bar is suspended until they answer.
///
/// The cache directory is wiped before cloning, so it must not be, or
/// contain, `home` or a system root.
///
/// # Errors
///
/// - Return [`CatalogError::UnsafeCache`] if cache directory is protected.
/// - Return [`CatalogError::Cache`] if old checkout cannot be removed.
/// - Return [`CatalogError::Fetch`] if libgit2 operations fail.
#[instrument(skip(url, branch, cache_dir, home), level = "debug")]
pub fn fetch_catalog(
    url: &str,
    branch: Option<&str>,
    cache_dir: &Path,
    home: &Path,
) -> Result<PathBuf> {
    info!("fetch catalog {url} into {:?}", cache_dir.display());
    check_not_protected(cache_dir, home)?;
    if cache_dir.exists() {
        remove_dir_all(cache_dir).map_err(|err| CatalogError::Cache {
            source: err,
            path: cache_dir.to_path_buf(),
        })?;
    }
    if let Some(parent) = cache_dir.parent() {
        mkdirp::mkdirp(parent).map_err(|err| CatalogError::Cache {
            source: err,
            path: parent.to_path_buf(),
        })?;
    }

    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message(url.to_string());
    bar.enable_steady_tick(time::Duration::from_millis(100));

    let prompter = IndicatifPrompter::new(bar.clone());
    let authenticator = GitAuthenticator::default().set_prompter(prompter);
    let config = Config::open_default().map_err(|err| CatalogError::Fetch {
        source: err,
        url: url.to_string(),
    })?;

    let mut throttle = time::Instant::now();
    let mut rc = RemoteCallbacks::new();
    rc.credentials(authenticator.credentials(&config));
    rc.transfer_progress(|progress| {
        if throttle.elapsed() > time::Duration::from_millis(10) {
            throttle = time::Instant::now();
            bar.set_length(progress.total_objects() as u64);
            bar.set_position(progress.received_objects() as u64);
        }
        true
    });

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(rc);
    let mut builder = RepoBuilder::new();
    builder.fetch_options(fo);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    let result = builder.clone(url, cache_dir);
    bar.finish_and_clear();
    result.map_err(|err| CatalogError::Fetch {
        source: err,
        url: url.to_string(),
    })?;

    Ok(cache_dir.to_path_buf())
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| -> Option<(String, String)> {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}
