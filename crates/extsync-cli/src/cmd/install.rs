use crate::cmd::sync::{execute, print_summary};
use crate::output::print_json;
use anyhow::{anyhow, Context};
use extsync_core::config::Config;
use extsync_core::lock::LockGuard;
use extsync_core::state::GlobalSyncState;
use extsync_core::sync::{self, SyncOptions};
use extsync_core::types::Platform;
use std::path::Path;

pub fn run(
    state_dir: &Path,
    config: &Config,
    name: &str,
    platform: Platform,
    project: &Path,
    post_update: bool,
    json: bool,
) -> anyhow::Result<()> {
    let project = std::fs::canonicalize(project)
        .with_context(|| format!("project directory not found: {}", project.display()))?;
    let project = project.display().to_string();

    {
        let lock = sync::default_lock(state_dir);
        let _guard = LockGuard::try_acquire(&lock).ok_or_else(|| {
            anyhow!(
                "another extsync run holds {}; try again shortly",
                lock.path().display()
            )
        })?;
        let mut state =
            GlobalSyncState::load_or_default(state_dir).context("failed to load state")?;
        if state.install(name, platform, &project) {
            state.save(state_dir).context("failed to save state")?;
            tracing::info!(extension = name, %platform, project = %project, "registered project");
        }
    }

    let summary = execute(
        state_dir,
        config,
        SyncOptions {
            force: true,
            platform: Some(platform),
        },
        post_update,
    )?;

    if json {
        return print_json(&summary);
    }
    if summary.applied.is_empty() && summary.failed.is_empty() {
        println!("{name} ({platform}) is installed in {project}");
    }
    print_summary(&summary);
    Ok(())
}
