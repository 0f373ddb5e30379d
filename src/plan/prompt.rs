// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive prompts.
//!
//! Terminal prompts only ever ask for two things: pick one entry out of a
//! list, or answer yes/no. Multi-selection menus are built on top of the
//! single pick by re-rendering a toggle list from an immutable [`Selection`]
//! snapshot until the user chooses "Done".

use crate::{
    plan::Result,
    platform::Scope,
};

use inquire::{Confirm, Select};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Source of interactive answers.
pub trait Prompter {
    /// Pick one entry from options, returning its index.
    fn select(&mut self, message: &str, options: &[String], cursor: usize) -> Result<usize>;

    /// Answer a yes/no question.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Terminal prompter backed by inquire.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn select(&mut self, message: &str, options: &[String], cursor: usize) -> Result<usize> {
        let answer = Select::new(message, options.to_vec())
            .with_starting_cursor(cursor)
            .with_page_size(options.len().max(1))
            .raw_prompt()?;
        Ok(answer.index)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }
}

/// Interactive resolution steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    SelectScope,
    SelectPlatforms,
    SelectPackages,
    ConfirmCompanionCommands,
    ConfirmIgnoreFile,
    Done,
}

impl PromptState {
    /// Step that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::SelectScope => Self::SelectPlatforms,
            Self::SelectPlatforms => Self::SelectPackages,
            Self::SelectPackages => Self::ConfirmCompanionCommands,
            Self::ConfirmCompanionCommands => Self::ConfirmIgnoreFile,
            Self::ConfirmIgnoreFile | Self::Done => Self::Done,
        }
    }
}

/// Event produced by one pick in a toggle menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleEvent {
    Toggle(usize),
    SelectAll,
    DeselectAll,
    Done,
}

/// Snapshot of a toggle menu.
///
/// # Invariant
///
/// - Applying an event never mutates the snapshot, it yields a new one.
/// - Toggling the same entry twice restores the original membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    chosen: Vec<bool>,
    done: bool,
}

impl Selection {
    /// Construct new selection of `len` entries with nothing chosen.
    pub fn new(len: usize) -> Self {
        Self {
            chosen: vec![false; len],
            done: false,
        }
    }

    /// Construct new selection with some entries already chosen.
    ///
    /// Out of range indices are ignored.
    pub fn with_chosen(len: usize, chosen: impl IntoIterator<Item = usize>) -> Self {
        chosen
            .into_iter()
            .fold(Self::new(len), |selection, index| {
                if selection.is_chosen(index) {
                    selection
                } else {
                    selection.apply(ToggleEvent::Toggle(index))
                }
            })
    }

    /// Reduce an event into a new snapshot.
    pub fn apply(&self, event: ToggleEvent) -> Self {
        let mut next = self.clone();
        match event {
            ToggleEvent::Toggle(index) => {
                if let Some(entry) = next.chosen.get_mut(index) {
                    *entry = !*entry;
                }
            }
            ToggleEvent::SelectAll => next.chosen.fill(true),
            ToggleEvent::DeselectAll => next.chosen.fill(false),
            ToggleEvent::Done => next.done = true,
        }

        next
    }

    pub fn is_chosen(&self, index: usize) -> bool {
        self.chosen.get(index).copied().unwrap_or(false)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn all_chosen(&self) -> bool {
        self.chosen.iter().all(|chosen| *chosen)
    }

    /// Indices of chosen entries, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.chosen
            .iter()
            .enumerate()
            .filter_map(|(index, chosen)| chosen.then_some(index))
            .collect()
    }

    /// Map a picked menu row back to the event it stands for.
    ///
    /// Rows are laid out as one row per entry, then the select/deselect all
    /// row, then the done row.
    pub fn event_for_row(&self, row: usize) -> ToggleEvent {
        let len = self.chosen.len();
        if row < len {
            ToggleEvent::Toggle(row)
        } else if row == len {
            if self.all_chosen() {
                ToggleEvent::DeselectAll
            } else {
                ToggleEvent::SelectAll
            }
        } else {
            ToggleEvent::Done
        }
    }

    /// Render menu rows for this snapshot.
    pub fn rows(&self, labels: &[impl Display]) -> Vec<String> {
        let mut rows = labels
            .iter()
            .enumerate()
            .map(|(index, label)| MenuRow::Entry { label, chosen: self.is_chosen(index) }.to_string())
            .collect::<Vec<_>>();
        rows.push(MenuRow::<&str>::All { all: self.all_chosen() }.to_string());
        rows.push(MenuRow::<&str>::Done.to_string());
        rows
    }
}

enum MenuRow<L> {
    Entry { label: L, chosen: bool },
    All { all: bool },
    Done,
}

impl<L: Display> Display for MenuRow<L> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Entry { label, chosen: true } => write!(fmt, "[x] {label}"),
            Self::Entry { label, chosen: false } => write!(fmt, "[ ] {label}"),
            Self::All { all: true } => fmt.write_str("Deselect all"),
            Self::All { all: false } => fmt.write_str("Select all"),
            Self::Done => fmt.write_str("Done"),
        }
    }
}

/// Ask for many entries through a toggle menu.
///
/// Returns indices of chosen labels once the user picks "Done".
pub fn select_many<P>(
    prompter: &mut P,
    message: &str,
    labels: &[impl Display],
    initial: Selection,
) -> Result<Vec<usize>>
where
    P: Prompter + ?Sized,
{
    let mut selection = initial;
    let mut cursor = 0;
    while !selection.is_done() {
        let rows = selection.rows(labels);
        let row = prompter.select(message, &rows, cursor)?;
        cursor = row;
        selection = selection.apply(selection.event_for_row(row));
    }

    Ok(selection.indices())
}

/// Ask for installation scope.
pub fn select_scope<P>(prompter: &mut P) -> Result<Scope>
where
    P: Prompter + ?Sized,
{
    let options = [
        "Global (home directory)".to_string(),
        "Local (current project)".to_string(),
    ];
    match prompter.select("Where should skills be installed?", &options, 0)? {
        1 => Ok(Scope::Local),
        _ => Ok(Scope::Global),
    }
}
