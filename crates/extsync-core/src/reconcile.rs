//! File reconciliation for one artifact category of one (extension, project) pair.
//!
//! Desired files are fetched, compared against what the engine last wrote, backed
//! up when the user changed them, and written. Files the engine wrote earlier but
//! no longer wants are deleted, but only when every desired file was refreshed;
//! a partial failure never deletes anything.

use crate::backup::{self, BackupLog, BackupRecord};
use crate::error::Result;
use crate::fingerprint::{fingerprint, fingerprint_file};
use crate::manifest::DesiredArtifact;
use crate::paths;
use crate::state::ManagedFileEntry;
use crate::types::ArtifactCategory;
use std::path::Path;

/// Result of reconciling one category.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CategoryOutcome {
    /// The managed set to persist for this category.
    pub entries: Vec<ManagedFileEntry>,
    /// At least one desired file could not be fetched, resolved or written.
    pub failed: bool,
    pub written: usize,
    pub deleted: usize,
    pub backed_up: usize,
}

impl CategoryOutcome {
    pub fn changed(&self) -> bool {
        self.written > 0 || self.deleted > 0
    }
}

pub struct FileReconciler<'a> {
    pub extension: &'a str,
    pub project: &'a Path,
    pub backups: &'a mut BackupLog,
}

impl FileReconciler<'_> {
    /// Converge `category` on disk to `desired`.
    ///
    /// `fetch` returns the desired content for a source path; `Ok(None)` and
    /// errors both count as a fetch failure for that path.
    pub fn reconcile<F>(
        &mut self,
        category: ArtifactCategory,
        desired: &[DesiredArtifact],
        previous: &[ManagedFileEntry],
        mut fetch: F,
    ) -> CategoryOutcome
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        let mut outcome = CategoryOutcome::default();
        let mut written: Vec<ManagedFileEntry> = Vec::with_capacity(desired.len());
        let normalized = self.normalize_entries(previous);
        let previous = normalized.as_slice();

        for artifact in desired {
            let destination = match paths::normalize_relative(self.project, &artifact.destination) {
                Ok(destination) => destination,
                Err(e) => {
                    tracing::warn!(
                        extension = self.extension,
                        %category,
                        path = %artifact.destination,
                        error = %e,
                        "skipping managed file"
                    );
                    outcome.failed = true;
                    continue;
                }
            };
            if written.iter().any(|e| e.path == destination) {
                continue;
            }
            let content = match fetch(&artifact.source) {
                Ok(Some(content)) => content,
                Ok(None) => {
                    tracing::warn!(
                        extension = self.extension,
                        %category,
                        source = %artifact.source,
                        "desired file not found upstream"
                    );
                    outcome.failed = true;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        extension = self.extension,
                        %category,
                        source = %artifact.source,
                        error = %e,
                        "failed to fetch desired file"
                    );
                    outcome.failed = true;
                    continue;
                }
            };

            match self.apply(&destination, &content, previous) {
                Ok(applied) => {
                    if applied.wrote {
                        outcome.written += 1;
                    }
                    if applied.backed_up {
                        outcome.backed_up += 1;
                    }
                    written.push(applied.entry);
                }
                Err(e) => {
                    tracing::warn!(
                        extension = self.extension,
                        %category,
                        path = %destination,
                        error = %e,
                        "skipping managed file"
                    );
                    outcome.failed = true;
                }
            }
        }

        if outcome.failed {
            outcome.entries = merge_partial(previous, written);
            return outcome;
        }

        let stale: Vec<&ManagedFileEntry> = previous
            .iter()
            .filter(|p| !written.iter().any(|w| w.path == p.path))
            .collect();
        for stale in stale {
            match self.remove_stale(stale) {
                Ok(true) => outcome.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        extension = self.extension,
                        %category,
                        path = %stale.path,
                        error = %e,
                        "could not remove stale managed file"
                    );
                    if !matches!(e, crate::error::SyncError::PathEscape { .. }) {
                        // Keep ownership so the next run retries the deletion.
                        written.push(stale.clone());
                    }
                }
            }
        }

        outcome.entries = written;
        outcome
    }

    fn apply(
        &mut self,
        destination: &str,
        content: &str,
        previous: &[ManagedFileEntry],
    ) -> Result<Applied> {
        let dest = paths::resolve_within(self.project, destination)?;
        let desired_hash = fingerprint(content.as_bytes());
        let current_hash = fingerprint_file(&dest)?;
        let stored_hash = previous
            .iter()
            .find(|e| e.path == destination)
            .and_then(ManagedFileEntry::stored_hash);

        // Content already equal to upstream holds nothing worth keeping, even when
        // another record sharing the file wrote it first.
        let modified = match (current_hash.as_deref(), stored_hash) {
            (None, _) => false,
            (Some(current), _) if current == desired_hash => false,
            (Some(current), Some(stored)) => current != stored,
            (Some(_), None) => true,
        };

        let mut backed_up = false;
        if modified {
            backed_up = self.backup(destination)?;
        }

        let wrote = current_hash.as_deref() != Some(desired_hash.as_str());
        if wrote {
            crate::io::atomic_write(&dest, content.as_bytes())?;
        }

        Ok(Applied {
            entry: ManagedFileEntry::new(destination, desired_hash),
            wrote,
            backed_up,
        })
    }

    /// Rewrite recorded paths into their canonical form, dropping duplicates.
    /// Paths that do not normalize are kept verbatim so stale removal can refuse them.
    fn normalize_entries(&self, entries: &[ManagedFileEntry]) -> Vec<ManagedFileEntry> {
        let mut normalized: Vec<ManagedFileEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = paths::normalize_relative(self.project, &entry.path)
                .unwrap_or_else(|_| entry.path.clone());
            if normalized.iter().any(|e| e.path == path) {
                continue;
            }
            normalized.push(ManagedFileEntry::new(path, entry.hash.clone()));
        }
        normalized
    }

    fn remove_stale(&mut self, stale: &ManagedFileEntry) -> Result<bool> {
        let path = paths::resolve_within(self.project, &stale.path)?;
        let Some(current) = fingerprint_file(&path)? else {
            return Ok(false);
        };
        if stale.stored_hash().is_some_and(|stored| stored != current) {
            self.backup(&stale.path)?;
        }
        let removed = crate::io::remove_if_exists(&path)?;
        if removed {
            tracing::info!(
                extension = self.extension,
                path = %stale.path,
                "removed file no longer shipped by extension"
            );
        }
        Ok(removed)
    }

    fn backup(&mut self, relative: &str) -> Result<bool> {
        let Some(backup_path) = backup::backup(self.project, relative)? else {
            return Ok(false);
        };
        tracing::warn!(
            extension = self.extension,
            path = relative,
            backup = %backup_path.display(),
            "local changes backed up before overwrite"
        );
        self.backups.push(BackupRecord {
            extension: self.extension.to_string(),
            project: self.project.to_path_buf(),
            relative_path: relative.to_string(),
            backup_path,
        });
        Ok(true)
    }
}

struct Applied {
    entry: ManagedFileEntry,
    wrote: bool,
    backed_up: bool,
}

/// Keep every previously owned entry, refreshing the ones written this run.
fn merge_partial(
    previous: &[ManagedFileEntry],
    written: Vec<ManagedFileEntry>,
) -> Vec<ManagedFileEntry> {
    let mut merged: Vec<ManagedFileEntry> = previous
        .iter()
        .map(|p| {
            written
                .iter()
                .find(|w| w.path == p.path)
                .cloned()
                .unwrap_or_else(|| p.clone())
        })
        .collect();
    for entry in written {
        if !merged.iter().any(|m| m.path == entry.path) {
            merged.push(entry);
        }
    }
    merged
}
