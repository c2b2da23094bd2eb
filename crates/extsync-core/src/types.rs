use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Host application an extension is installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Claude,
    Cursor,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Claude => "claude",
            Platform::Cursor => "cursor",
        }
    }

    pub fn all() -> &'static [Platform] {
        &[Platform::Claude, Platform::Cursor]
    }

    /// Project-relative directory holding the host's own files.
    pub fn host_dir(&self) -> &'static str {
        match self {
            Platform::Claude => ".claude",
            Platform::Cursor => ".cursor",
        }
    }

    /// Project-relative location of the host configuration document that hooks are merged into.
    pub fn hook_config_file(&self) -> &'static str {
        match self {
            Platform::Claude => ".claude/settings.json",
            Platform::Cursor => ".cursor/hooks.json",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Platform::Claude),
            "cursor" => Ok(Platform::Cursor),
            other => Err(SyncError::UnknownPlatform(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactCategory
// ---------------------------------------------------------------------------

/// File-backed artifact kinds reconciled independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactCategory {
    Commands,
    Rules,
    Tools,
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactCategory::Commands => "commands",
            ArtifactCategory::Rules => "rules",
            ArtifactCategory::Tools => "tools",
        }
    }

    pub fn all() -> &'static [ArtifactCategory] {
        &[
            ArtifactCategory::Commands,
            ArtifactCategory::Rules,
            ArtifactCategory::Tools,
        ]
    }

    /// Project-relative destination directory for this category on `platform`.
    pub fn destination_dir(&self, platform: Platform) -> String {
        match self {
            ArtifactCategory::Commands | ArtifactCategory::Rules => {
                format!("{}/{}", platform.host_dir(), self.as_str())
            }
            ArtifactCategory::Tools => crate::paths::TOOLS_DIR.to_string(),
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
