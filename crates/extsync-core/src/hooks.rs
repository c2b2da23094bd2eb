//! Hook registration inside host configuration documents.
//!
//! The two hosts store hooks differently:
//!
//! - list-style (`cursor`, `.cursor/hooks.json`):
//!   `{"version": 1, "hooks": {"stop": [{"command": "..."}]}}`
//! - grouped-style (`claude`, `.claude/settings.json`):
//!   `{"hooks": {"Stop": [{"hooks": [{"type": "command", "command": "...", "timeout": 60}]}]}}`
//!
//! Both are edited through [`HostConfigAdapter`] so the ownership rule lives in
//! one place: an extension only ever removes commands it recorded as its own,
//! matched by exact string. Everything else in the document is passed through.

use crate::error::Result;
use crate::paths;
use crate::types::Platform;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Timeout written on new grouped-style hook entries, in seconds.
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 60;

/// Format marker written into fresh list-style documents.
pub const LIST_DOCUMENT_VERSION: u64 = 1;

pub trait HostConfigAdapter {
    /// Whether any entry under `event` carries exactly `command`.
    fn has_command(&self, event: &str, command: &str) -> bool;
    /// Append `command` under `event` unless already present. Returns true if added.
    fn add_command(&mut self, event: &str, command: &str) -> bool;
    /// Remove every entry under `event` whose command is exactly `command`.
    fn remove_command(&mut self, event: &str, command: &str) -> bool;
    fn serialize(&self) -> Result<String>;
}

/// Normalize a rendered command to the hosts' convention of forward-slash paths.
pub fn normalize_command(command: &str) -> String {
    command.replace('\\', "/")
}

/// Parse a host document, falling back to an empty one when it is not a JSON object.
fn parse_document(raw: Option<&str>, origin: &str) -> Map<String, Value> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!(path = origin, "host config is not a JSON object, starting fresh");
            Map::new()
        }
        Err(e) => {
            tracing::warn!(path = origin, error = %e, "malformed host config, starting fresh");
            Map::new()
        }
    }
}

fn hooks_object(root: &mut Map<String, Value>) -> &mut Map<String, Value> {
    let hooks = root.entry("hooks").or_insert_with(|| json!({}));
    if !hooks.is_object() {
        tracing::warn!("replacing non-object `hooks` field");
        *hooks = json!({});
    }
    match hooks {
        Value::Object(map) => map,
        _ => unreachable!("hooks was just made an object"),
    }
}

fn event_array<'a>(root: &'a mut Map<String, Value>, event: &str) -> &'a mut Vec<Value> {
    let entries = hooks_object(root)
        .entry(event.to_string())
        .or_insert_with(|| json!([]));
    if !entries.is_array() {
        tracing::warn!(event, "replacing non-array hook event");
        *entries = json!([]);
    }
    match entries {
        Value::Array(list) => list,
        _ => unreachable!("event was just made an array"),
    }
}

fn existing_event<'a>(root: &'a Map<String, Value>, event: &str) -> &'a [Value] {
    root.get("hooks")
        .and_then(|h| h.get(event))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn command_of(entry: &Value) -> Option<&str> {
    entry.get("command").and_then(Value::as_str)
}

/// Drop `event` when a removal left it empty.
fn prune_event(root: &mut Map<String, Value>, event: &str) {
    if let Some(Value::Object(hooks)) = root.get_mut("hooks") {
        if hooks
            .get(event)
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty)
        {
            // retain keeps the order of the remaining events
            hooks.retain(|key, _| key != event);
        }
    }
}

fn to_pretty(root: &Map<String, Value>) -> Result<String> {
    let mut out = serde_json::to_string_pretty(root)?;
    out.push('\n');
    Ok(out)
}

// ---------------------------------------------------------------------------
// List-style
// ---------------------------------------------------------------------------

pub struct ListStyleConfig {
    root: Map<String, Value>,
}

impl ListStyleConfig {
    pub fn parse(raw: Option<&str>, origin: &str) -> Self {
        let mut root = parse_document(raw, origin);
        if root.is_empty() {
            root.insert("version".to_string(), json!(LIST_DOCUMENT_VERSION));
        }
        Self { root }
    }
}

impl HostConfigAdapter for ListStyleConfig {
    fn has_command(&self, event: &str, command: &str) -> bool {
        existing_event(&self.root, event)
            .iter()
            .any(|e| command_of(e) == Some(command))
    }

    fn add_command(&mut self, event: &str, command: &str) -> bool {
        if self.has_command(event, command) {
            return false;
        }
        event_array(&mut self.root, event).push(json!({ "command": command }));
        true
    }

    fn remove_command(&mut self, event: &str, command: &str) -> bool {
        if !self.has_command(event, command) {
            return false;
        }
        event_array(&mut self.root, event).retain(|e| command_of(e) != Some(command));
        prune_event(&mut self.root, event);
        true
    }

    fn serialize(&self) -> Result<String> {
        to_pretty(&self.root)
    }
}

// ---------------------------------------------------------------------------
// Grouped-style
// ---------------------------------------------------------------------------

pub struct GroupedStyleConfig {
    root: Map<String, Value>,
}

impl GroupedStyleConfig {
    pub fn parse(raw: Option<&str>, origin: &str) -> Self {
        Self {
            root: parse_document(raw, origin),
        }
    }
}

fn group_commands(group: &Value) -> impl Iterator<Item = &str> {
    group
        .get("hooks")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(command_of)
}

impl HostConfigAdapter for GroupedStyleConfig {
    fn has_command(&self, event: &str, command: &str) -> bool {
        existing_event(&self.root, event)
            .iter()
            .any(|group| group_commands(group).any(|c| c == command))
    }

    fn add_command(&mut self, event: &str, command: &str) -> bool {
        if self.has_command(event, command) {
            return false;
        }
        event_array(&mut self.root, event).push(json!({
            "hooks": [{
                "type": "command",
                "command": command,
                "timeout": DEFAULT_HOOK_TIMEOUT_SECS,
            }]
        }));
        true
    }

    fn remove_command(&mut self, event: &str, command: &str) -> bool {
        if !self.has_command(event, command) {
            return false;
        }
        let groups = event_array(&mut self.root, event);
        groups.retain_mut(|group| {
            let Some(entries) = group.get_mut("hooks").and_then(Value::as_array_mut) else {
                return true;
            };
            let before = entries.len();
            entries.retain(|e| command_of(e) != Some(command));
            // Only groups this removal emptied are dropped.
            !(entries.is_empty() && before > 0)
        });
        prune_event(&mut self.root, event);
        true
    }

    fn serialize(&self) -> Result<String> {
        to_pretty(&self.root)
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

pub fn adapter_for(platform: Platform, raw: Option<&str>, origin: &str) -> Box<dyn HostConfigAdapter> {
    match platform {
        Platform::Claude => Box::new(GroupedStyleConfig::parse(raw, origin)),
        Platform::Cursor => Box::new(ListStyleConfig::parse(raw, origin)),
    }
}

/// Apply one extension's desired hooks to `adapter`.
///
/// Returns the hooks the extension owns afterwards and whether the document changed.
pub fn reconcile_hooks(
    adapter: &mut dyn HostConfigAdapter,
    desired: &BTreeMap<String, String>,
    previous: &BTreeMap<String, Vec<String>>,
) -> (BTreeMap<String, Vec<String>>, bool) {
    let desired: BTreeMap<&str, String> = desired
        .iter()
        .map(|(event, command)| (event.as_str(), normalize_command(command)))
        .collect();
    let mut changed = false;

    for (event, owned) in previous {
        for command in owned {
            if desired.get(event.as_str()) != Some(command) {
                changed |= adapter.remove_command(event, command);
            }
        }
    }

    let mut owned = BTreeMap::new();
    for (event, command) in desired {
        let added = adapter.add_command(event, &command);
        changed |= added;
        let owned_before = previous
            .get(event)
            .is_some_and(|commands| commands.contains(&command));
        // An identical command that someone else registered stays theirs.
        if added || owned_before {
            owned.insert(event.to_string(), vec![command]);
        }
    }
    (owned, changed)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOutcome {
    pub owned: BTreeMap<String, Vec<String>>,
    pub changed: bool,
}

/// Reconcile the hook document of `platform` inside `project`, writing it only if it changed.
pub fn sync_hook_document(
    project: &Path,
    platform: Platform,
    desired: &BTreeMap<String, String>,
    previous: &BTreeMap<String, Vec<String>>,
) -> Result<HookOutcome> {
    let relative = platform.hook_config_file();
    let path = paths::resolve_within(project, relative)?;
    let raw = crate::io::read_optional(&path)?;
    if raw.is_none() && desired.is_empty() {
        return Ok(HookOutcome::default());
    }

    let origin = path.display().to_string();
    let mut adapter = adapter_for(platform, raw.as_deref(), &origin);
    let (owned, changed) = reconcile_hooks(adapter.as_mut(), desired, previous);
    if changed {
        crate::io::atomic_write(&path, adapter.serialize()?.as_bytes())?;
        tracing::info!(path = %path.display(), "updated hook registrations");
    }
    Ok(HookOutcome { owned, changed })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
