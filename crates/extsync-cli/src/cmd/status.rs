use crate::output::{print_json, print_table};
use anyhow::Context;
use extsync_core::state::GlobalSyncState;
use std::path::Path;

pub fn run(state_dir: &Path, json: bool) -> anyhow::Result<()> {
    let state = GlobalSyncState::load_or_default(state_dir).context("failed to load state")?;

    if json {
        return print_json(&state);
    }

    let last_check = state
        .last_check
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "auto-update: {}   cooldown: {}h   last check: {}",
        if state.auto_update { "on" } else { "off" },
        state.cooldown_hours,
        last_check
    );

    if state.installed_extensions.is_empty() {
        println!("No extensions installed.");
        return Ok(());
    }

    println!();
    let rows = state
        .installed_extensions
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.platform.to_string(),
                r.version.clone(),
                r.project_paths.len().to_string(),
            ]
        })
        .collect();
    print_table(&["EXTENSION", "PLATFORM", "VERSION", "PROJECTS"], rows);
    Ok(())
}
