use crate::error::Result;
use crate::migrations;
use crate::paths;
use crate::types::{ArtifactCategory, Platform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version assigned to freshly registered extensions so the first sync applies them.
pub const UNAPPLIED_VERSION: &str = "0.0.0";

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A file the engine wrote, with the fingerprint of what it wrote.
///
/// An empty `hash` means the baseline is unknown (entry migrated from the
/// path-only schema). Fresh writes always record a real fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedFileEntry {
    pub path: String,
    #[serde(default)]
    pub hash: String,
}

impl ManagedFileEntry {
    pub fn new(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }

    pub fn stored_hash(&self) -> Option<&str> {
        (!self.hash.is_empty()).then_some(self.hash.as_str())
    }
}

/// Everything one extension owns inside one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<ManagedFileEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ManagedFileEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ManagedFileEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hooks: BTreeMap<String, Vec<String>>,
}

impl ManagedState {
    pub fn entries(&self, category: ArtifactCategory) -> &[ManagedFileEntry] {
        match category {
            ArtifactCategory::Commands => &self.commands,
            ArtifactCategory::Rules => &self.rules,
            ArtifactCategory::Tools => &self.tools,
        }
    }

    pub fn set_entries(&mut self, category: ArtifactCategory, entries: Vec<ManagedFileEntry>) {
        match category {
            ArtifactCategory::Commands => self.commands = entries,
            ArtifactCategory::Rules => self.rules = entries,
            ArtifactCategory::Tools => self.tools = entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    pub name: String,
    pub version: String,
    pub platform: Platform,
    #[serde(default)]
    pub project_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub managed: BTreeMap<String, ManagedState>,
    /// Projects whose directory was missing when `version` was applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_projects: Vec<String>,
}

impl ExtensionRecord {
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            version: UNAPPLIED_VERSION.to_string(),
            platform,
            project_paths: Vec::new(),
            managed: BTreeMap::new(),
            pending_projects: Vec::new(),
        }
    }

    /// Remember that `project` still needs the current version.
    pub fn mark_pending(&mut self, project: &str) {
        if !self.pending_projects.iter().any(|p| p == project) {
            self.pending_projects.push(project.to_string());
        }
    }

    pub fn clear_pending(&mut self, project: &str) {
        self.pending_projects.retain(|p| p != project);
    }

    /// Add a project path, keeping the set free of duplicates. Returns true if added.
    pub fn add_project_path(&mut self, project: &str) -> bool {
        if self.project_paths.iter().any(|p| p == project) {
            return false;
        }
        self.project_paths.push(project.to_string());
        true
    }
}

// ---------------------------------------------------------------------------
// GlobalSyncState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSyncState {
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub installed_extensions: Vec<ExtensionRecord>,
}

fn default_auto_update() -> bool {
    true
}

fn default_cooldown_hours() -> f64 {
    24.0
}

impl Default for GlobalSyncState {
    fn default() -> Self {
        Self {
            auto_update: default_auto_update(),
            cooldown_hours: default_cooldown_hours(),
            last_check: None,
            installed_extensions: Vec::new(),
        }
    }
}

impl GlobalSyncState {
    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Load the state file, or `None` if nothing was ever installed.
    ///
    /// Legacy managed entries are normalized before the typed state is built,
    /// so nothing downstream sees the old schema.
    pub fn load(state_dir: &Path) -> Result<Option<Self>> {
        let path = paths::state_path(state_dir);
        let Some(data) = crate::io::read_optional(&path)? else {
            return Ok(None);
        };
        let raw: serde_json::Value = serde_json::from_str(&data)?;
        let normalized = migrations::normalize_state(raw);
        Ok(Some(serde_json::from_value(normalized)?))
    }

    pub fn load_or_default(state_dir: &Path) -> Result<Self> {
        Ok(Self::load(state_dir)?.unwrap_or_default())
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = paths::state_path(state_dir);
        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    pub fn find(&self, name: &str, platform: Platform) -> Option<&ExtensionRecord> {
        self.installed_extensions
            .iter()
            .find(|r| r.name == name && r.platform == platform)
    }

    /// Register `project` for the extension, creating the record on first install.
    /// Returns true if the state changed.
    pub fn register(&mut self, name: &str, platform: Platform, project: &str) -> bool {
        if let Some(record) = self
            .installed_extensions
            .iter_mut()
            .find(|r| r.name == name && r.platform == platform)
        {
            return record.add_project_path(project);
        }
        let mut record = ExtensionRecord::new(name, platform);
        record.add_project_path(project);
        self.installed_extensions.push(record);
        true
    }

    /// Register `project` and make the next run apply the extension to it.
    ///
    /// A project joining an already applied extension resets the recorded
    /// version, so the next run reconciles every project of that extension.
    pub fn install(&mut self, name: &str, platform: Platform, project: &str) -> bool {
        if !self.register(name, platform, project) {
            return false;
        }
        if let Some(record) = self
            .installed_extensions
            .iter_mut()
            .find(|r| r.name == name && r.platform == platform)
        {
            record.version = UNAPPLIED_VERSION.to_string();
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
