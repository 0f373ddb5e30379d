// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Run reporting.
//!
//! Turn the results of a run into something a human can read, and handle the
//! optional side effects that follow a local install.

pub mod gitignore;

use crate::{platform::PlatformId, sync::SyncOperation};

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Aggregated outcome of every pair in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub commands_installed: usize,
    lines: Vec<SummaryLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SummaryLine {
    platform: PlatformId,
    package: String,
    outcome: String,
}

impl Summary {
    /// Construct new summary from run results, keeping their order.
    pub fn new(operations: &[SyncOperation]) -> Self {
        let lines = operations
            .iter()
            .map(|op| SummaryLine {
                platform: op.platform,
                package: op.package.clone(),
                outcome: match (&op.result.error, op.result.command_installed) {
                    (Some(error), _) => format!("failed: {error}"),
                    (None, true) => "ok (+command)".into(),
                    (None, false) => "ok".into(),
                },
            })
            .collect();
        let succeeded = operations.iter().filter(|op| op.result.success).count();

        Self {
            attempted: operations.len(),
            succeeded,
            failed: operations.len() - succeeded,
            commands_installed: operations
                .iter()
                .filter(|op| op.result.command_installed)
                .count(),
            lines,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl Display for Summary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let platform_width = self
            .lines
            .iter()
            .map(|line| line.platform.to_string().len())
            .max()
            .unwrap_or(0);
        let package_width = self
            .lines
            .iter()
            .map(|line| line.package.len())
            .max()
            .unwrap_or(0);

        for line in &self.lines {
            writeln!(
                fmt,
                "{:<platform_width$}  {:<package_width$}  {}",
                line.platform.to_string(),
                line.package,
                line.outcome
            )?;
        }

        write!(
            fmt,
            "{} attempted, {} succeeded, {} failed, {} commands installed",
            self.attempted, self.succeeded, self.failed, self.commands_installed
        )
    }
}
