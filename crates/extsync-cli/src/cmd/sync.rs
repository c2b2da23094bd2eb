use crate::output::print_json;
use anyhow::{anyhow, Context};
use chrono::Utc;
use extsync_core::config::Config;
use extsync_core::paths;
use extsync_core::post_update::{NoopPostUpdate, PostUpdateHook, ShellPostUpdate};
use extsync_core::sync::{self, SkipReason, SyncOptions, SyncSummary, Synchronizer};
use std::path::Path;

pub fn run(
    state_dir: &Path,
    config: &Config,
    options: SyncOptions,
    post_update: bool,
    json: bool,
) -> anyhow::Result<()> {
    let summary = execute(state_dir, config, options, post_update)?;
    if json {
        return print_json(&summary);
    }
    print_summary(&summary);
    Ok(())
}

/// Run one cycle against the configured source.
pub fn execute(
    state_dir: &Path,
    config: &Config,
    options: SyncOptions,
    post_update: bool,
) -> anyhow::Result<SyncSummary> {
    let source = config.build_source()?.ok_or_else(|| {
        anyhow!(
            "no extension source configured: set source.url or source.dir in {} or pass --source-url / --source-dir",
            paths::config_path(state_dir).display()
        )
    })?;
    let lock = sync::default_lock(state_dir);
    let hook: &dyn PostUpdateHook = if post_update {
        &ShellPostUpdate
    } else {
        &NoopPostUpdate
    };

    Synchronizer::new(state_dir, &*source, hook, &lock)
        .run(options, Utc::now())
        .context("synchronization failed")
}

pub fn print_summary(summary: &SyncSummary) {
    match summary.skipped {
        Some(SkipReason::Locked) => {
            println!("Another extsync run is in progress; nothing done.");
            return;
        }
        Some(SkipReason::NothingInstalled) => {
            println!("No extensions installed.");
            return;
        }
        Some(SkipReason::Cooldown) => {
            println!("Checked recently; use --force to sync now.");
            return;
        }
        None => {}
    }

    for applied in &summary.applied {
        println!(
            "Updated {} ({}) {} -> {}",
            applied.name, applied.platform, applied.from, applied.to
        );
    }
    for name in &summary.failed {
        eprintln!("warning: {name} did not fully apply; it will be retried on the next sync");
    }
    if summary.applied.is_empty() && summary.failed.is_empty() {
        println!("Everything is up to date.");
    }
    if let Some(report) = &summary.report {
        println!(
            "{} modified file(s) were backed up. See {}",
            summary.backups,
            report.display()
        );
    }
}
