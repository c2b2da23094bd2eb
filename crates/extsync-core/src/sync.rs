//! One synchronization run across every installed extension.
//!
//! The run holds the global lock for its whole duration, reads the state once,
//! reconciles each (extension, project) pair, then writes the report and the
//! state once. Per-pair failures are logged and isolated. A stop request from a
//! post-update command aborts the run before anything is persisted.

use crate::backup::BackupLog;
use crate::cooldown;
use crate::error::Result;
use crate::hooks;
use crate::lock::{LockGuard, MutationLock};
use crate::manifest::RemoteManifest;
use crate::paths;
use crate::post_update::PostUpdateHook;
use crate::reconcile::FileReconciler;
use crate::source::ExtensionSource;
use crate::state::{ExtensionRecord, GlobalSyncState, ManagedState};
use crate::types::{ArtifactCategory, Platform};
use crate::version;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Ignore the auto-update flag and the cooldown.
    pub force: bool,
    /// Only process extensions installed for this platform.
    pub platform: Option<Platform>,
}

/// Why a run ended before touching any extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Locked,
    NothingInstalled,
    Cooldown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedExtension {
    pub name: String,
    pub platform: Platform,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub applied: Vec<AppliedExtension>,
    /// Extensions with at least one failed project; they keep their old version.
    pub failed: Vec<String>,
    pub backups: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl SyncSummary {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Default::default()
        }
    }

    pub fn any_applied(&self) -> bool {
        !self.applied.is_empty()
    }
}

enum ProjectStatus {
    Reconciled,
    Partial,
    Missing,
}

enum ExtensionResult {
    Unavailable,
    UpToDate,
    Applied { from: String },
    Partial,
}

pub struct Synchronizer<'a> {
    state_dir: PathBuf,
    source: &'a dyn ExtensionSource,
    post_update: &'a dyn PostUpdateHook,
    lock: &'a dyn MutationLock,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        state_dir: impl Into<PathBuf>,
        source: &'a dyn ExtensionSource,
        post_update: &'a dyn PostUpdateHook,
        lock: &'a dyn MutationLock,
    ) -> Self {
        Self {
            state_dir: state_dir.into(),
            source,
            post_update,
            lock,
        }
    }

    /// Run one cycle. Returns true iff at least one extension was applied.
    pub fn synchronize(&self, options: SyncOptions) -> Result<bool> {
        Ok(self.run(options, Utc::now())?.any_applied())
    }

    /// Run one cycle as of `now` and describe what happened.
    pub fn run(&self, options: SyncOptions, now: DateTime<Utc>) -> Result<SyncSummary> {
        let Some(_guard) = LockGuard::try_acquire(self.lock) else {
            tracing::info!("another synchronization is in progress, skipping");
            return Ok(SyncSummary::skipped(SkipReason::Locked));
        };

        let Some(mut state) = GlobalSyncState::load(&self.state_dir)? else {
            tracing::debug!(state_dir = %self.state_dir.display(), "no extensions installed");
            return Ok(SyncSummary::skipped(SkipReason::NothingInstalled));
        };

        if !cooldown::should_run(&state, options.force, now) {
            tracing::debug!(last_check = ?state.last_check, "cooldown not elapsed");
            return Ok(SyncSummary::skipped(SkipReason::Cooldown));
        }

        let mut summary = SyncSummary::default();
        let mut backups = BackupLog::new();

        for record in state.installed_extensions.iter_mut() {
            if options.platform.is_some_and(|p| p != record.platform) {
                continue;
            }
            match self.sync_extension(record, &mut backups)? {
                ExtensionResult::Applied { from } => {
                    tracing::info!(
                        extension = %record.name,
                        platform = %record.platform,
                        from = %from,
                        to = %record.version,
                        "extension updated"
                    );
                    summary.applied.push(AppliedExtension {
                        name: record.name.clone(),
                        platform: record.platform,
                        from,
                        to: record.version.clone(),
                    });
                }
                ExtensionResult::Partial => summary.failed.push(record.name.clone()),
                ExtensionResult::UpToDate | ExtensionResult::Unavailable => {}
            }
        }

        summary.backups = backups.records().len();
        let report_path = paths::report_path(&self.state_dir);
        if backups.write_report(&report_path, now)? {
            tracing::warn!(report = %report_path.display(), "modified files were backed up");
            summary.report = Some(report_path);
        }

        state.last_check = Some(now);
        state.save(&self.state_dir)?;
        Ok(summary)
    }

    fn sync_extension(
        &self,
        record: &mut ExtensionRecord,
        backups: &mut BackupLog,
    ) -> Result<ExtensionResult> {
        let manifest = match self.source.fetch_manifest(&record.name) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                tracing::warn!(extension = %record.name, "extension not found at source");
                return Ok(ExtensionResult::Unavailable);
            }
            Err(e) => {
                tracing::warn!(extension = %record.name, error = %e, "failed to fetch manifest");
                return Ok(ExtensionResult::Unavailable);
            }
        };

        if !version::is_newer(&manifest.version, &record.version) {
            return self.catch_up_pending(record, &manifest, backups);
        }

        let projects = record.project_paths.clone();
        if !self.sync_projects(record, &manifest, projects, backups)? {
            return Ok(ExtensionResult::Partial);
        }
        let from = std::mem::replace(&mut record.version, manifest.version.clone());
        Ok(ExtensionResult::Applied { from })
    }

    /// Bring projects that were missing when the recorded version was applied up
    /// to it, once their directories exist again. Only possible while the source
    /// still publishes that exact version.
    fn catch_up_pending(
        &self,
        record: &mut ExtensionRecord,
        manifest: &RemoteManifest,
        backups: &mut BackupLog,
    ) -> Result<ExtensionResult> {
        let due: Vec<String> = record
            .pending_projects
            .iter()
            .filter(|p| Path::new(p.as_str()).is_dir())
            .cloned()
            .collect();
        let same_version =
            version::compare_versions(&manifest.version, &record.version) == Some(Ordering::Equal);
        if due.is_empty() || !same_version {
            tracing::debug!(
                extension = %record.name,
                installed = %record.version,
                available = %manifest.version,
                "up to date"
            );
            return Ok(ExtensionResult::UpToDate);
        }

        tracing::info!(
            extension = %record.name,
            version = %record.version,
            projects = due.len(),
            "catching up projects that reappeared"
        );
        if self.sync_projects(record, manifest, due, backups)? {
            Ok(ExtensionResult::UpToDate)
        } else {
            Ok(ExtensionResult::Partial)
        }
    }

    /// Reconcile `projects` in order. Returns false if any present project failed.
    fn sync_projects(
        &self,
        record: &mut ExtensionRecord,
        manifest: &RemoteManifest,
        projects: Vec<String>,
        backups: &mut BackupLog,
    ) -> Result<bool> {
        let mut clean = true;
        for project in projects {
            match self.sync_project(record, manifest, &project, backups) {
                Ok(ProjectStatus::Reconciled) => record.clear_pending(&project),
                Ok(ProjectStatus::Missing) => record.mark_pending(&project),
                Ok(ProjectStatus::Partial) => clean = false,
                Err(e) if e.is_stop() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        extension = %record.name,
                        project = %project,
                        error = %e,
                        "project sync failed"
                    );
                    clean = false;
                }
            }
        }
        Ok(clean)
    }

    /// Reconcile one project. `Partial` when some item failed but the managed
    /// state was still updated with what succeeded.
    fn sync_project(
        &self,
        record: &mut ExtensionRecord,
        manifest: &RemoteManifest,
        project: &str,
        backups: &mut BackupLog,
    ) -> Result<ProjectStatus> {
        let root = Path::new(project);
        if !root.is_dir() {
            tracing::warn!(
                extension = %record.name,
                project,
                "project directory missing, will retry when it reappears"
            );
            return Ok(ProjectStatus::Missing);
        }

        let name = record.name.clone();
        let platform = record.platform;
        let mut managed = record.managed.get(project).cloned().unwrap_or_default();
        let mut clean = true;

        for &category in ArtifactCategory::all() {
            let desired = manifest.desired_artifacts(category, platform);
            let mut reconciler = FileReconciler {
                extension: &name,
                project: root,
                backups: &mut *backups,
            };
            let outcome = reconciler.reconcile(category, &desired, managed.entries(category), |src| {
                self.source.fetch_file(&name, src)
            });
            tracing::debug!(
                extension = %name,
                project,
                %category,
                written = outcome.written,
                deleted = outcome.deleted,
                "category reconciled"
            );
            clean &= !outcome.failed;
            managed.set_entries(category, outcome.entries);
        }

        let desired_hooks = manifest.render_hooks(root);
        match hooks::sync_hook_document(root, platform, &desired_hooks, &managed.hooks) {
            Ok(outcome) => managed.hooks = outcome.owned,
            Err(e) => {
                tracing::warn!(extension = %name, project, error = %e, "hook reconciliation failed");
                clean = false;
            }
        }

        if managed == ManagedState::default() {
            record.managed.remove(project);
        } else {
            record.managed.insert(project.to_string(), managed);
        }

        if !clean {
            return Ok(ProjectStatus::Partial);
        }
        self.post_update.run(manifest, root, platform)?;
        Ok(ProjectStatus::Reconciled)
    }
}

/// Convenience for the common case: the marker-file lock in `state_dir`.
pub fn default_lock(state_dir: &Path) -> crate::lock::FileLock {
    crate::lock::FileLock::new(paths::lock_path(state_dir))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::post_update::NoopPostUpdate;
    use crate::state::ManagedFileEntry;
    use std::cell::Cell;
    use std::collections::{HashMap, HashSet};
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemorySource {
        manifests: HashMap<String, RemoteManifest>,
        files: HashMap<(String, String), String>,
        broken: HashSet<String>,
    }

    impl MemorySource {
        fn publish(&mut self, name: &str, manifest: serde_json::Value, files: &[(&str, &str)]) {
            self.manifests
                .insert(name.to_string(), serde_json::from_value(manifest).unwrap());
            self.files.retain(|(ext, _), _| ext != name);
            for (path, body) in files {
                self.files
                    .insert((name.to_string(), path.to_string()), body.to_string());
            }
        }
    }

    impl ExtensionSource for MemorySource {
        fn fetch_manifest(&self, extension: &str) -> Result<Option<RemoteManifest>> {
            if self.broken.contains(extension) {
                return Err(SyncError::Fetch(format!("{extension}/extension.json")));
            }
            Ok(self.manifests.get(extension).cloned())
        }

        fn fetch_file(&self, extension: &str, relative: &str) -> Result<Option<String>> {
            Ok(self
                .files
                .get(&(extension.to_string(), relative.to_string()))
                .cloned())
        }
    }

    #[derive(Default)]
    struct TestLock {
        held_elsewhere: bool,
        released: Cell<bool>,
    }

    impl MutationLock for TestLock {
        fn acquire(&self) -> bool {
            !self.held_elsewhere
        }

        fn release(&self) {
            self.released.set(true);
        }
    }

    struct StopHook;

    impl PostUpdateHook for StopHook {
        fn run(&self, _: &RemoteManifest, _: &Path, _: Platform) -> Result<()> {
            Err(SyncError::StopPropagation("maintenance window".into()))
        }
    }

    struct FailingHook;

    impl PostUpdateHook for FailingHook {
        fn run(&self, _: &RemoteManifest, _: &Path, _: Platform) -> Result<()> {
            Err(SyncError::PostUpdateFailed("exit 1".into()))
        }
    }

    struct Fixture {
        home: TempDir,
        project: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                home: TempDir::new().unwrap(),
                project: TempDir::new().unwrap(),
            }
        }

        fn project_str(&self) -> String {
            self.project.path().to_str().unwrap().to_string()
        }

        fn install(&self, name: &str, platform: Platform) {
            let mut state = GlobalSyncState::load_or_default(self.home.path()).unwrap();
            state.register(name, platform, &self.project_str());
            state.save(self.home.path()).unwrap();
        }

        fn state(&self) -> GlobalSyncState {
            GlobalSyncState::load(self.home.path()).unwrap().unwrap()
        }

        fn read(&self, rel: &str) -> String {
            std::fs::read_to_string(self.project.path().join(rel)).unwrap()
        }

        fn run_with(
            &self,
            source: &MemorySource,
            hook: &dyn PostUpdateHook,
            lock: &dyn MutationLock,
            options: SyncOptions,
        ) -> Result<SyncSummary> {
            Synchronizer::new(self.home.path(), source, hook, lock).run(options, Utc::now())
        }

        fn run(&self, source: &MemorySource) -> SyncSummary {
            self.run_with(source, &NoopPostUpdate, &TestLock::default(), forced())
                .unwrap()
        }
    }

    fn forced() -> SyncOptions {
        SyncOptions {
            force: true,
            platform: None,
        }
    }

    fn commit_v1(source: &mut MemorySource) {
        source.publish(
            "auto-commit",
            serde_json::json!({
                "version": "1.0.0",
                "files": { "claude": { "commands": ["commands/commit.md", "commands/push.md"],
                                       "rules": ["rules/style.md"] } },
                "tools": { "auto-commit": ["run.py"] },
                "hooks": { "Stop": "python3 {{TOOLS_DIR}}/auto-commit/run.py" }
            }),
            &[
                ("commands/commit.md", "# commit v1\n"),
                ("commands/push.md", "# push v1\n"),
                ("rules/style.md", "be terse\n"),
                ("tools/auto-commit/run.py", "print('hi')\n"),
            ],
        );
    }

    #[test]
    fn first_run_applies_everything_then_settles() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let summary = fx.run(&source);
        assert_eq!(summary.applied.len(), 1);
        assert_eq!(summary.applied[0].from, "0.0.0");
        assert_eq!(summary.applied[0].to, "1.0.0");
        assert_eq!(fx.read(".claude/commands/commit.md"), "# commit v1\n");
        assert_eq!(fx.read(".claude/rules/style.md"), "be terse\n");
        assert_eq!(fx.read("tools/auto-commit/run.py"), "print('hi')\n");
        assert!(fx.read(".claude/settings.json").contains("auto-commit/run.py"));

        let state = fx.state();
        let record = state.find("auto-commit", Platform::Claude).unwrap();
        assert_eq!(record.version, "1.0.0");
        let managed = &record.managed[&fx.project_str()];
        assert_eq!(managed.commands.len(), 2);
        assert!(managed.commands.iter().all(|e| e.hash.len() == 64));
        assert_eq!(managed.hooks["Stop"].len(), 1);
        assert!(state.last_check.is_some());

        let settings_before = fx.read(".claude/settings.json");
        let again = fx.run(&source);
        assert!(!again.any_applied());
        assert_eq!(fx.read(".claude/settings.json"), settings_before);
        assert_eq!(fx.state().installed_extensions, state.installed_extensions);
    }

    #[test]
    fn upgrade_backs_up_edits_and_removes_dropped_files() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let mut source = MemorySource::default();
        commit_v1(&mut source);
        fx.run(&source);

        std::fs::write(
            fx.project.path().join(".claude/commands/commit.md"),
            "# my tweaks\n",
        )
        .unwrap();
        source.publish(
            "auto-commit",
            serde_json::json!({
                "version": "1.1.0",
                "files": { "claude": { "commands": ["commands/commit.md"] } }
            }),
            &[("commands/commit.md", "# commit v2\n")],
        );

        let summary = fx.run(&source);
        assert_eq!(summary.applied[0].to, "1.1.0");
        assert_eq!(summary.backups, 1);
        assert_eq!(fx.read(".claude/commands/commit.md"), "# commit v2\n");
        assert_eq!(
            fx.read(".extsync/overrides/.claude/commands/commit.md"),
            "# my tweaks\n"
        );
        assert!(!fx.project.path().join(".claude/commands/push.md").exists());
        assert!(!fx.project.path().join(".claude/rules/style.md").exists());
        assert!(!fx.project.path().join("tools/auto-commit/run.py").exists());

        let settings = fx.read(".claude/settings.json");
        assert!(!settings.contains("run.py"));

        let report = std::fs::read_to_string(summary.report.unwrap()).unwrap();
        assert!(report.contains("## auto-commit"));
        assert!(report.contains(".claude/commands/commit.md"));

        let state = fx.state();
        let managed = &state.installed_extensions[0].managed[&fx.project_str()];
        assert_eq!(managed.commands.len(), 1);
        assert!(managed.rules.is_empty());
        assert!(managed.hooks.is_empty());
    }

    #[test]
    fn missing_file_keeps_version_but_persists_progress() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let mut source = MemorySource::default();
        commit_v1(&mut source);
        source
            .files
            .remove(&("auto-commit".to_string(), "commands/push.md".to_string()));

        let summary = fx.run(&source);
        assert!(!summary.any_applied());
        assert_eq!(summary.failed, vec!["auto-commit".to_string()]);
        assert_eq!(fx.read(".claude/commands/commit.md"), "# commit v1\n");

        let state = fx.state();
        let record = &state.installed_extensions[0];
        assert_eq!(record.version, "0.0.0");
        let managed = &record.managed[&fx.project_str()];
        assert_eq!(
            managed.commands.iter().map(|e| e.path.as_str()).collect::<Vec<_>>(),
            vec![".claude/commands/commit.md"]
        );

        commit_v1(&mut source);
        let retry = fx.run(&source);
        assert!(retry.any_applied());
        assert_eq!(fx.read(".claude/commands/push.md"), "# push v1\n");
    }

    #[test]
    fn one_broken_extension_does_not_block_others() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        fx.install("lint", Platform::Claude);
        let mut source = MemorySource::default();
        commit_v1(&mut source);
        source.broken.insert("lint".to_string());

        let summary = fx.run(&source);
        assert_eq!(summary.applied.len(), 1);
        assert_eq!(summary.applied[0].name, "auto-commit");
        let state = fx.state();
        assert_eq!(state.find("lint", Platform::Claude).unwrap().version, "0.0.0");
    }

    #[test]
    fn failing_post_update_is_isolated() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let summary = fx
            .run_with(&source, &FailingHook, &TestLock::default(), forced())
            .unwrap();
        assert!(!summary.any_applied());
        assert_eq!(fx.state().installed_extensions[0].version, "0.0.0");
        assert_eq!(fx.read(".claude/commands/commit.md"), "# commit v1\n");
    }

    #[test]
    fn stop_request_aborts_without_persisting_and_releases_lock() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let before = std::fs::read_to_string(paths::state_path(fx.home.path())).unwrap();
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let lock = TestLock::default();
        let err = fx.run_with(&source, &StopHook, &lock, forced()).unwrap_err();
        assert!(err.is_stop());
        assert!(lock.released.get());
        assert_eq!(
            std::fs::read_to_string(paths::state_path(fx.home.path())).unwrap(),
            before
        );
    }

    #[test]
    fn contended_lock_skips_without_touching_state() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let lock = TestLock {
            held_elsewhere: true,
            ..Default::default()
        };
        let summary = fx.run_with(&source, &NoopPostUpdate, &lock, forced()).unwrap();
        assert_eq!(summary.skipped, Some(SkipReason::Locked));
        assert!(!lock.released.get());
        assert!(fx.state().last_check.is_none());
        assert!(!fx.project.path().join(".claude").exists());
    }

    #[test]
    fn cooldown_gates_unforced_runs() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        let mut state = fx.state();
        let checked = Utc::now() - chrono::Duration::hours(1);
        state.last_check = Some(checked);
        state.save(fx.home.path()).unwrap();
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let summary = fx
            .run_with(&source, &NoopPostUpdate, &TestLock::default(), SyncOptions::default())
            .unwrap();
        assert_eq!(summary.skipped, Some(SkipReason::Cooldown));
        assert_eq!(fx.state().last_check, Some(checked));
    }

    #[test]
    fn nothing_installed_is_a_no_op() {
        let fx = Fixture::new();
        let source = MemorySource::default();
        let lock = TestLock::default();
        let synchronizer = Synchronizer::new(fx.home.path(), &source, &NoopPostUpdate, &lock);
        assert!(!synchronizer.synchronize(forced()).unwrap());
        assert!(!paths::state_path(fx.home.path()).exists());
    }

    #[test]
    fn platform_filter_limits_the_run() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        fx.install("auto-commit", Platform::Cursor);
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let summary = fx
            .run_with(
                &source,
                &NoopPostUpdate,
                &TestLock::default(),
                SyncOptions {
                    force: true,
                    platform: Some(Platform::Cursor),
                },
            )
            .unwrap();
        assert_eq!(summary.applied.len(), 1);
        assert_eq!(summary.applied[0].platform, Platform::Cursor);
        let state = fx.state();
        assert_eq!(state.find("auto-commit", Platform::Claude).unwrap().version, "0.0.0");
        assert!(fx.project.path().join("tools/auto-commit/run.py").exists());
        assert!(!fx.project.path().join(".claude").exists());
        assert!(fx.read(".cursor/hooks.json").contains("\"version\": 1"));
    }

    #[test]
    fn missing_project_is_caught_up_when_it_reappears() {
        let fx = Fixture::new();
        let later = fx.project.path().join("later");
        let later_str = later.to_str().unwrap().to_string();
        fx.install("auto-commit", Platform::Claude);
        let mut state = fx.state();
        state.register("auto-commit", Platform::Claude, &later_str);
        state.save(fx.home.path()).unwrap();
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let summary = fx.run(&source);
        assert!(summary.any_applied());
        assert!(summary.failed.is_empty());
        let record = fx.state().installed_extensions[0].clone();
        assert_eq!(record.version, "1.0.0");
        assert_eq!(record.pending_projects, vec![later_str.clone()]);
        assert!(!record.managed.contains_key(&later_str));

        // Still missing: nothing to do, stays pending.
        fx.run(&source);
        assert_eq!(fx.state().installed_extensions[0].pending_projects.len(), 1);

        std::fs::create_dir_all(&later).unwrap();
        let summary = fx.run(&source);
        assert!(!summary.any_applied());
        assert!(summary.failed.is_empty());
        assert_eq!(
            std::fs::read_to_string(later.join(".claude/commands/commit.md")).unwrap(),
            "# commit v1\n"
        );
        let record = fx.state().installed_extensions[0].clone();
        assert!(record.pending_projects.is_empty());
        assert_eq!(record.managed[&later_str].commands.len(), 2);
        assert_eq!(record.version, "1.0.0");
    }

    #[test]
    fn shared_tool_files_are_not_backed_up_across_platforms() {
        let fx = Fixture::new();
        fx.install("auto-commit", Platform::Claude);
        fx.install("auto-commit", Platform::Cursor);
        let mut source = MemorySource::default();
        let publish = |source: &mut MemorySource, version: &str, body: &str| {
            source.publish(
                "auto-commit",
                serde_json::json!({
                    "version": version,
                    "files": {
                        "claude": { "commands": ["commands/commit.md"] },
                        "cursor": { "commands": ["commands/commit.md"] }
                    },
                    "tools": { "auto-commit": ["run.py"] }
                }),
                &[
                    ("commands/commit.md", "# commit\n"),
                    ("tools/auto-commit/run.py", body),
                ],
            );
        };
        publish(&mut source, "1.0.0", "print('v1')\n");
        let first = fx.run(&source);
        assert_eq!(first.applied.len(), 2);
        assert_eq!(first.backups, 0);

        publish(&mut source, "1.1.0", "print('v2')\n");
        let summary = fx.run(&source);
        assert_eq!(summary.applied.len(), 2);
        assert_eq!(summary.backups, 0);
        assert!(summary.report.is_none());
        assert_eq!(fx.read("tools/auto-commit/run.py"), "print('v2')\n");
        assert!(!fx
            .project
            .path()
            .join(".extsync/overrides/tools/auto-commit/run.py")
            .exists());
    }

    #[test]
    fn legacy_entries_are_upgraded_to_fingerprints() {
        let fx = Fixture::new();
        let project = fx.project_str();
        std::fs::create_dir_all(fx.project.path().join(".claude/commands")).unwrap();
        std::fs::write(
            fx.project.path().join(".claude/commands/commit.md"),
            "# commit v1\n",
        )
        .unwrap();
        let mut managed = serde_json::Map::new();
        managed.insert(
            project.clone(),
            serde_json::json!({ "commands": [".claude/commands/commit.md"] }),
        );
        let legacy = serde_json::json!({
            "autoUpdate": true,
            "cooldownHours": 24,
            "installedExtensions": [{
                "name": "auto-commit",
                "version": "0.9.0",
                "platform": "claude",
                "projectPaths": [project],
                "managed": managed
            }]
        });
        std::fs::write(
            paths::state_path(fx.home.path()),
            serde_json::to_string(&legacy).unwrap(),
        )
        .unwrap();
        let mut source = MemorySource::default();
        commit_v1(&mut source);

        let summary = fx.run(&source);
        assert!(summary.any_applied());
        assert_eq!(summary.backups, 0);
        let state = fx.state();
        let entry: &ManagedFileEntry = &state.installed_extensions[0].managed[&project].commands[0];
        assert_eq!(entry.hash, crate::fingerprint::fingerprint(b"# commit v1\n"));
    }
}
