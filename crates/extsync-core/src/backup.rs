use crate::error::Result;
use crate::paths;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Copy the current file at `relative` into the project's override tree.
///
/// The copy keeps the same relative path under `.extsync/overrides/`. Returns
/// `None` when the source no longer exists.
pub fn backup(project: &Path, relative: &str) -> Result<Option<PathBuf>> {
    let source = paths::resolve_within(project, relative)?;
    if !source.is_file() {
        return Ok(None);
    }
    let target = paths::resolve_within(&paths::override_root(project), relative)?;
    if let Some(parent) = target.parent() {
        crate::io::ensure_dir(parent)?;
    }
    std::fs::copy(&source, &target)?;
    Ok(Some(target))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub extension: String,
    pub project: PathBuf,
    pub relative_path: String,
    pub backup_path: PathBuf,
}

/// Backups taken during one run, in the order they happened.
#[derive(Debug, Default)]
pub struct BackupLog {
    records: Vec<BackupRecord>,
}

impl BackupLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BackupRecord) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BackupRecord] {
        &self.records
    }

    /// Markdown summary grouped by extension, extensions in first-seen order.
    pub fn render_report(&self, generated_at: DateTime<Utc>) -> String {
        let mut out = String::from("# extsync update report\n\n");
        out.push_str(&format!("Generated: {}\n\n", generated_at.to_rfc3339()));
        out.push_str(
            "Files you had modified were replaced by extension updates.\n\
             Your versions were saved under each project's `.extsync/overrides/` directory.\n",
        );

        let mut extensions: Vec<&str> = Vec::new();
        for record in &self.records {
            if !extensions.contains(&record.extension.as_str()) {
                extensions.push(&record.extension);
            }
        }

        for extension in extensions {
            out.push_str(&format!("\n## {extension}\n\n"));
            for record in self.records.iter().filter(|r| r.extension == extension) {
                out.push_str(&format!(
                    "- `{}` in `{}` -> `{}`\n",
                    record.relative_path,
                    record.project.display(),
                    record.backup_path.display()
                ));
            }
        }
        out
    }

    /// Write the report to `path`, replacing any previous one. No-op when empty.
    pub fn write_report(&self, path: &Path, generated_at: DateTime<Utc>) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }
        crate::io::atomic_write(path, self.render_report(generated_at).as_bytes())?;
        Ok(true)
    }
}
