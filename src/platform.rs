// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Supported installation platforms.
//!
//! A __platform__ is an agent host that reads skills from its own place on
//! the file system. Each platform knows two roots for skills, one under the
//! user's home directory (global scope) and one under the current project
//! (local scope). Some platforms also accept __companion commands__, i.e.,
//! small command files derived from a skill, which live under a separate
//! command root.
//!
//! The platform table is compiled in. Nothing about it is discovered at
//! runtime, so every lookup goes through [`PlatformId`].

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Installation scope.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Install into the user's home directory.
    #[default]
    Global,

    /// Install into the current project directory.
    Local,
}

impl Display for Scope {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Global => fmt.write_str("global"),
            Self::Local => fmt.write_str("local"),
        }
    }
}

/// Closed set of supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    Claude,
    OpenCode,
    Gemini,
    Codex,
}

impl PlatformId {
    /// Every platform in display order.
    pub const ALL: [PlatformId; 4] = [
        PlatformId::Claude,
        PlatformId::OpenCode,
        PlatformId::Gemini,
        PlatformId::Codex,
    ];

    /// Static configuration record for this platform.
    pub fn descriptor(self) -> &'static PlatformDescriptor {
        match self {
            Self::Claude => &CLAUDE,
            Self::OpenCode => &OPENCODE,
            Self::Gemini => &GEMINI,
            Self::Codex => &CODEX,
        }
    }
}

impl Display for PlatformId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.descriptor().name)
    }
}

/// Static configuration of a single platform.
///
/// Global templates may start with `~`, which the path resolver expands to
/// the user's home directory. Local templates are always relative to the
/// current working directory. A missing command root means the platform
/// cannot take companion commands in that scope.
#[derive(Debug, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub id: PlatformId,
    pub name: &'static str,
    pub global_package_root: &'static str,
    pub local_package_root: &'static str,
    pub global_command_root: Option<&'static str>,
    pub local_command_root: Option<&'static str>,
    pub command_extension: &'static str,

    /// Command files must have the placeholder token replaced with the
    /// installed skill path.
    pub interpolate_command: bool,
}

impl PlatformDescriptor {
    pub fn package_root_template(&self, scope: Scope) -> &'static str {
        match scope {
            Scope::Global => self.global_package_root,
            Scope::Local => self.local_package_root,
        }
    }

    pub fn command_root_template(&self, scope: Scope) -> Option<&'static str> {
        match scope {
            Scope::Global => self.global_command_root,
            Scope::Local => self.local_command_root,
        }
    }

    pub fn supports_commands(&self, scope: Scope) -> bool {
        self.command_root_template(scope).is_some()
    }
}

static CLAUDE: PlatformDescriptor = PlatformDescriptor {
    id: PlatformId::Claude,
    name: "Claude",
    global_package_root: "~/.claude/skills",
    local_package_root: ".claude/skills",
    global_command_root: None,
    local_command_root: None,
    command_extension: ".md",
    interpolate_command: false,
};

static OPENCODE: PlatformDescriptor = PlatformDescriptor {
    id: PlatformId::OpenCode,
    name: "OpenCode",
    global_package_root: "~/.config/opencode/skills",
    local_package_root: ".opencode/skills",
    global_command_root: Some("~/.config/opencode/command"),
    local_command_root: Some(".opencode/command"),
    command_extension: ".md",
    interpolate_command: true,
};

static GEMINI: PlatformDescriptor = PlatformDescriptor {
    id: PlatformId::Gemini,
    name: "Gemini",
    global_package_root: "~/.gemini/skills",
    local_package_root: ".gemini/skills",
    global_command_root: Some("~/.gemini/commands"),
    local_command_root: Some(".gemini/commands"),
    command_extension: ".toml",
    interpolate_command: true,
};

static CODEX: PlatformDescriptor = PlatformDescriptor {
    id: PlatformId::Codex,
    name: "Codex",
    global_package_root: "~/.codex/skills",
    local_package_root: ".codex/skills",
    global_command_root: Some("~/.codex/prompts"),
    local_command_root: None,
    command_extension: ".md",
    interpolate_command: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn descriptor_lookup_matches_id() {
        for id in PlatformId::ALL {
            assert_eq!(id.descriptor().id, id);
        }
    }

    #[test]
    fn global_templates_live_under_home() {
        for id in PlatformId::ALL {
            let platform = id.descriptor();
            assert!(platform.global_package_root.starts_with("~/"));
            if let Some(root) = platform.global_command_root {
                assert!(root.starts_with("~/"));
            }
        }
    }

    #[test]
    fn local_templates_are_relative() {
        for id in PlatformId::ALL {
            let platform = id.descriptor();
            assert!(!platform.local_package_root.starts_with(['~', '/']));
            if let Some(root) = platform.local_command_root {
                assert!(!root.starts_with(['~', '/']));
            }
        }
    }

    #[test]
    fn command_support_is_per_scope() {
        assert!(!PlatformId::Claude.descriptor().supports_commands(Scope::Global));
        assert!(PlatformId::Codex.descriptor().supports_commands(Scope::Global));
        assert!(!PlatformId::Codex.descriptor().supports_commands(Scope::Local));
    }

    #[test]
    fn platform_ids_deserialize_lowercase() -> anyhow::Result<()> {
        #[derive(Deserialize)]
        struct Probe {
            platform: PlatformId,
        }

        let probe: Probe = toml::from_str(r#"platform = "opencode""#)?;
        assert_eq!(probe.platform, PlatformId::OpenCode);

        Ok(())
    }
}
