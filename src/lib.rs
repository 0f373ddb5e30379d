// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Selective skill installer for AI coding assistants.
//!
//! A __skill__ is a directory in a catalog that carries a manifest file named
//! "SKILL.md", plus whatever supporting files it needs. Some skills also ship
//! __companion commands__, which are small templates that let a platform
//! invoke the skill by name.
//!
//! The installer copies a chosen subset of skills from the catalog into the
//! skill roots of one or more platforms, either globally under the user's
//! home directory, or locally under the current project. Every install
//! replaces the previous copy of a skill outright, so running the installer
//! again with the same selection always lands on the same result.
//!
//! # Flow
//!
//! 1. [`catalog`] finds out which skills exist.
//! 2. [`plan`] resolves flags, prompts, and defaults into an install plan.
//! 3. [`path`] maps each platform and scope onto concrete directories.
//! 4. [`sync`] performs every platform and skill pair of the plan.
//! 5. [`report`] summarizes the run, and updates the project's ignore file
//!    when asked to.

pub mod catalog;
pub mod config;
pub mod path;
pub mod plan;
pub mod platform;
pub mod report;
pub mod sync;
