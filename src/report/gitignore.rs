// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Ignore file registration.
//!
//! Local installs drop skills into the project tree, which users usually do
//! not want to commit. The installer can register each platform's local
//! skill root in the project's ".gitignore", grouped under a marker comment.
//!
//! Only missing entries are ever added. Existing lines are kept exactly as
//! they are, and a project without an ignore file is left alone.

use crate::platform::PlatformDescriptor;

use ignore::gitignore::GitignoreBuilder;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Comment line that heads the block of installer entries.
pub const MARKER: &str = "# skillsync";

/// Name of the ignore file at the project root.
pub const IGNORE_FILE: &str = ".gitignore";

/// Result of an ignore file update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreOutcome {
    /// Project has no ignore file.
    Missing,

    /// Every entry was already covered.
    Unchanged,

    /// Entries that were appended.
    Updated(Vec<String>),
}

/// Ignore entries for the local skill roots of given platforms.
pub fn ignore_entries<'a>(
    platforms: impl IntoIterator<Item = &'a PlatformDescriptor>,
) -> Vec<String> {
    let mut entries = Vec::new();
    for platform in platforms {
        let entry = format!("/{}/", platform.local_package_root.trim_matches('/'));
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    entries
}

/// Register entries in the ignore file of a project.
///
/// An entry counts as present if the ignore file has the exact line, or if
/// its existing rules already ignore the path.
///
/// # Errors
///
/// - Return [`IgnoreFileError::Read`] if the ignore file cannot be read.
/// - Return [`IgnoreFileError::Write`] if the ignore file cannot be written.
#[instrument(skip(project_root, entries), level = "debug")]
pub fn update_ignore_file(
    project_root: impl AsRef<Path>,
    entries: &[String],
) -> Result<IgnoreOutcome> {
    let project_root = project_root.as_ref();
    let path = project_root.join(IGNORE_FILE);
    let content = match read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("no {IGNORE_FILE} in {:?}, skip update", project_root.display());
            return Ok(IgnoreOutcome::Missing);
        }
        Err(err) => return Err(IgnoreFileError::Read { source: err, path }),
    };

    let mut builder = GitignoreBuilder::new(project_root);
    if let Some(err) = builder.add(&path) {
        warn!("some rules of {:?} could not be parsed: {err}", path.display());
    }
    let matcher = builder.build().ok();

    let mut editor = IgnoreFileEdit::from(content.as_str());
    let mut added = Vec::new();
    for entry in entries {
        let relative = entry.trim_matches('/');
        let covered = matcher.as_ref().is_some_and(|matcher| {
            matcher
                .matched_path_or_any_parents(project_root.join(relative), true)
                .is_ignore()
        });
        if covered {
            debug!("{entry} already ignored");
            continue;
        }

        if editor.insert_entry(entry) {
            added.push(entry.clone());
        }
    }

    if !editor.changed {
        return Ok(IgnoreOutcome::Unchanged);
    }

    write(&path, editor.to_string()).map_err(|err| IgnoreFileError::Write {
        source: err,
        path: path.clone(),
    })?;
    info!("added {} entries to {:?}", added.len(), path.display());

    Ok(IgnoreOutcome::Updated(added))
}

/// Ignore file editor.
///
/// # Invariant
///
/// - Existing lines, including their line endings, are never rewritten.
/// - No duplicate entries.
/// - New entries always land in the marker block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IgnoreFileEdit {
    lines: Vec<String>,
    changed: bool,
}

impl IgnoreFileEdit {
    /// Check if ignore file has entry as a line of its own.
    pub fn contains_entry(&self, entry: &str) -> bool {
        self.lines.iter().any(|line| line.trim() == entry.trim())
    }

    /// Insert entry into marker block.
    ///
    /// Returns `false` if entry was already present.
    pub fn insert_entry(&mut self, entry: impl AsRef<str>) -> bool {
        let entry = entry.as_ref().trim();
        if self.contains_entry(entry) {
            return false;
        }

        // INVARIANT: Last line must be terminated before anything follows it.
        if let Some(last) = self.lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }

        let marker = self.lines.iter().position(|line| line.trim() == MARKER);
        match marker {
            Some(index) => {
                let end = self.lines[index + 1..]
                    .iter()
                    .position(|line| line.trim().is_empty())
                    .map(|offset| index + 1 + offset)
                    .unwrap_or(self.lines.len());
                self.lines.insert(end, format!("{entry}\n"));
            }
            None => {
                if self.lines.last().is_some_and(|line| !line.trim().is_empty()) {
                    self.lines.push("\n".into());
                }
                self.lines.push(format!("{MARKER}\n"));
                self.lines.push(format!("{entry}\n"));
            }
        }
        self.changed = true;

        true
    }
}

impl Display for IgnoreFileEdit {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for line in &self.lines {
            fmt.write_str(line)?;
        }

        Ok(())
    }
}

impl From<&str> for IgnoreFileEdit {
    fn from(content: &str) -> Self {
        Self {
            lines: content.split_inclusive('\n').map(str::to_owned).collect(),
            changed: false,
        }
    }
}

/// Ignore file error types.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreFileError {
    /// Ignore file exists but cannot be read.
    #[error("failed to read ignore file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Ignore file cannot be written to.
    #[error("failed to write ignore file at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = IgnoreFileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformId;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn entries_for_local_roots() {
        let result = ignore_entries(
            [PlatformId::Claude, PlatformId::OpenCode, PlatformId::Claude]
                .into_iter()
                .map(PlatformId::descriptor),
        );
        assert_eq!(
            result,
            vec!["/.claude/skills/".to_string(), "/.opencode/skills/".to_string()]
        );
    }

    #[test]
    fn insert_creates_marker_block() {
        let mut editor = IgnoreFileEdit::from("target/\n*.swp");
        assert!(editor.insert_entry("/.claude/skills/"));
        assert!(editor.insert_entry("/.gemini/skills/"));
        assert!(!editor.insert_entry("/.claude/skills/"));

        let expect = indoc! {"
            target/
            *.swp

            # skillsync
            /.claude/skills/
            /.gemini/skills/
        "};
        assert_eq!(editor.to_string(), expect);
    }

    #[test]
    fn insert_extends_existing_marker_block() {
        let content = indoc! {"
            # skillsync
            /.claude/skills/

            # build output
            target/
        "};
        let mut editor = IgnoreFileEdit::from(content);
        assert!(editor.insert_entry("/.codex/skills/"));

        let expect = indoc! {"
            # skillsync
            /.claude/skills/
            /.codex/skills/

            # build output
            target/
        "};
        assert_eq!(editor.to_string(), expect);
    }

    #[test]
    fn unrelated_lines_keep_their_endings() {
        let mut editor = IgnoreFileEdit::from("target/\r\nnode_modules/\r\n");
        editor.insert_entry("/.claude/skills/");
        assert_eq!(
            editor.to_string(),
            "target/\r\nnode_modules/\r\n\n# skillsync\n/.claude/skills/\n"
        );
    }

    #[sealed_test]
    fn update_skips_missing_ignore_file() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let result = update_ignore_file(&root, &["/.claude/skills/".to_string()])?;

        assert_eq!(result, IgnoreOutcome::Missing);
        assert!(!root.join(IGNORE_FILE).exists());

        Ok(())
    }

    #[sealed_test]
    fn update_appends_only_uncovered_entries() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        write(root.join(IGNORE_FILE), "target/\n.opencode/\n")?;

        let entries = ignore_entries(
            [PlatformId::Claude, PlatformId::OpenCode]
                .into_iter()
                .map(PlatformId::descriptor),
        );
        let result = update_ignore_file(&root, &entries)?;
        assert_eq!(result, IgnoreOutcome::Updated(vec!["/.claude/skills/".into()]));

        let expect = indoc! {"
            target/
            .opencode/

            # skillsync
            /.claude/skills/
        "};
        assert_eq!(read_to_string(root.join(IGNORE_FILE))?, expect);

        // Running again changes nothing.
        let result = update_ignore_file(&root, &entries)?;
        assert_eq!(result, IgnoreOutcome::Unchanged);
        assert_eq!(read_to_string(root.join(IGNORE_FILE))?, expect);

        Ok(())
    }
}
