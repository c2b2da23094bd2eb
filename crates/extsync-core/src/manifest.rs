use crate::paths;
use crate::types::{ArtifactCategory, Platform};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Name of the manifest document at the root of every extension.
pub const MANIFEST_FILE: &str = "extension.json";

// ---------------------------------------------------------------------------
// RemoteManifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformFiles {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// The fields of a published extension manifest the engine consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub version: String,
    /// Keyed by platform name (`claude`, `cursor`).
    #[serde(default)]
    pub files: BTreeMap<String, PlatformFiles>,
    /// Tool name to the files making up that tool.
    #[serde(default)]
    pub tools: BTreeMap<String, Vec<String>>,
    /// Hook event name to command template.
    #[serde(default)]
    pub hooks: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_update: Option<String>,
}

/// One file to materialize: where it comes from and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredArtifact {
    /// Path relative to the extension root, passed to the file fetcher.
    pub source: String,
    /// Path relative to the project root.
    pub destination: String,
}

impl RemoteManifest {
    /// Resolve the desired files of `category` for `platform`, in manifest order.
    pub fn desired_artifacts(
        &self,
        category: ArtifactCategory,
        platform: Platform,
    ) -> Vec<DesiredArtifact> {
        let dest_dir = category.destination_dir(platform);
        match category {
            ArtifactCategory::Commands | ArtifactCategory::Rules => {
                let Some(files) = self.files.get(platform.as_str()) else {
                    return Vec::new();
                };
                let sources = if category == ArtifactCategory::Commands {
                    &files.commands
                } else {
                    &files.rules
                };
                sources
                    .iter()
                    .map(|source| {
                        let trimmed = source.trim_start_matches("./");
                        let below = trimmed
                            .strip_prefix(category.as_str())
                            .and_then(|rest| rest.strip_prefix('/'))
                            .unwrap_or(trimmed);
                        DesiredArtifact {
                            source: trimmed.to_string(),
                            destination: format!("{dest_dir}/{below}"),
                        }
                    })
                    .collect()
            }
            ArtifactCategory::Tools => self
                .tools
                .iter()
                .flat_map(|(tool, files)| {
                    let dest_dir = dest_dir.clone();
                    files.iter().map(move |file| {
                        let file = file.trim_start_matches("./");
                        DesiredArtifact {
                            source: format!("{}/{tool}/{file}", paths::TOOLS_DIR),
                            destination: format!("{dest_dir}/{tool}/{file}"),
                        }
                    })
                })
                .collect(),
        }
    }

    /// Render every hook template for `project`.
    pub fn render_hooks(&self, project: &Path) -> BTreeMap<String, String> {
        self.hooks
            .iter()
            .map(|(event, template)| (event.clone(), render_template(template, project)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Hook templates
// ---------------------------------------------------------------------------

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Z_]+)\s*\}\}").unwrap())
}

/// Substitute `{{PROJECT_DIR}}` and `{{TOOLS_DIR}}`; unknown placeholders stay verbatim.
pub fn render_template(template: &str, project: &Path) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| match &caps[1] {
            "PROJECT_DIR" => project.display().to_string(),
            "TOOLS_DIR" => project.join(paths::TOOLS_DIR).display().to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> RemoteManifest {
        serde_json::from_str(
            r#"{
                "name": "auto-commit",
                "version": "1.4.0",
                "files": {
                    "claude": { "commands": ["commands/commit.md", "./commands/git/push.md"], "rules": ["style.md"] },
                    "cursor": { "commands": ["commands/commit.md"] }
                },
                "tools": { "auto-commit": ["auto_commit.py", "config.yaml"] },
                "hooks": { "Stop": "python3 {{TOOLS_DIR}}/auto-commit/auto_commit.py --root {{PROJECT_DIR}}" },
                "postUpdate": "python3 tools/auto-commit/auto_commit.py --setup"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_consumed_fields() {
        let m = manifest();
        assert_eq!(m.version, "1.4.0");
        assert_eq!(m.post_update.as_deref(), Some("python3 tools/auto-commit/auto_commit.py --setup"));
        assert_eq!(m.hooks.len(), 1);
    }

    #[test]
    fn minimal_manifest_parses() {
        let m: RemoteManifest = serde_json::from_str(r#"{"version":"0.1.0"}"#).unwrap();
        assert!(m.files.is_empty());
        assert!(m
            .desired_artifacts(ArtifactCategory::Commands, Platform::Claude)
            .is_empty());
    }

    #[test]
    fn commands_map_under_host_directory() {
        let desired = manifest().desired_artifacts(ArtifactCategory::Commands, Platform::Claude);
        assert_eq!(
            desired,
            vec![
                DesiredArtifact {
                    source: "commands/commit.md".into(),
                    destination: ".claude/commands/commit.md".into(),
                },
                DesiredArtifact {
                    source: "commands/git/push.md".into(),
                    destination: ".claude/commands/git/push.md".into(),
                },
            ]
        );
    }

    #[test]
    fn rules_without_category_prefix_keep_their_path() {
        let desired = manifest().desired_artifacts(ArtifactCategory::Rules, Platform::Claude);
        assert_eq!(desired[0].source, "style.md");
        assert_eq!(desired[0].destination, ".claude/rules/style.md");
        assert!(manifest()
            .desired_artifacts(ArtifactCategory::Rules, Platform::Cursor)
            .is_empty());
    }

    #[test]
    fn tools_map_to_project_tools_dir() {
        let desired = manifest().desired_artifacts(ArtifactCategory::Tools, Platform::Cursor);
        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0].source, "tools/auto-commit/auto_commit.py");
        assert_eq!(desired[0].destination, "tools/auto-commit/auto_commit.py");
    }

    #[test]
    fn renders_known_placeholders_only() {
        let project = Path::new("/work/app");
        let rendered = render_template("run {{PROJECT_DIR}} {{ TOOLS_DIR }} {{HOME}}", project);
        assert_eq!(rendered, "run /work/app /work/app/tools {{HOME}}");
        let hooks = manifest().render_hooks(project);
        assert_eq!(
            hooks["Stop"],
            "python3 /work/app/tools/auto-commit/auto_commit.py --root /work/app"
        );
    }
}
