// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Companion command templates.
//!
//! A skill may ship command templates under its "commands/" directory, one
//! per command format. Platforms pick the template whose file extension
//! matches their own command format. Some platforms need to know where the
//! skill was installed, so their templates carry a placeholder token that
//! gets replaced with the installed skill path.

use crate::catalog::{PackageDescriptor, COMMANDS_DIR};

use std::path::{Path, PathBuf};
use tracing::debug;

/// Token replaced with the installed skill path.
pub const PLACEHOLDER: &str = "{{SKILL_PATH}}";

/// Find command template of a skill for given file extension.
///
/// Picks the first matching file in lexical order. Returns `None` if the
/// skill has no template in that format.
pub fn find_command_source(package: &PackageDescriptor, extension: &str) -> Option<PathBuf> {
    let dir = package.source_path.join(COMMANDS_DIR);
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(dir.to_str()?),
        glob::Pattern::escape(extension)
    );

    let mut matches = match glob::glob(&pattern) {
        Ok(paths) => paths
            .filter_map(|path| path.ok())
            .filter(|path| path.is_file())
            .collect::<Vec<_>>(),
        Err(err) => {
            debug!("bad command pattern {pattern:?}: {err}");
            return None;
        }
    };
    matches.sort();
    matches.into_iter().next()
}

/// Location of a skill's command file under a command root.
pub fn command_target(command_root: &Path, name: &str, extension: &str) -> PathBuf {
    command_root.join(format!("{name}{extension}"))
}

/// Replace every placeholder token with the installed skill path.
pub fn render(template: &str, skill_path: &Path) -> String {
    template.replace(PLACEHOLDER, skill_path.to_string_lossy().as_ref())
}
