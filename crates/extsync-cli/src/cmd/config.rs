use crate::output::print_json;
use anyhow::{anyhow, bail, Context};
use clap::Subcommand;
use extsync_core::config::Config;
use extsync_core::lock::LockGuard;
use extsync_core::state::GlobalSyncState;
use extsync_core::sync;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the current settings
    Show,

    /// Change one or more settings
    Set {
        /// Run unforced syncs at all
        #[arg(long)]
        auto_update: Option<bool>,
        /// Minimum hours between unforced syncs
        #[arg(long)]
        cooldown_hours: Option<f64>,
        /// HTTP base URL extensions are published under
        #[arg(long, conflicts_with = "dir")]
        url: Option<String>,
        /// Local directory holding extensions
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Per-request timeout for the HTTP source
        #[arg(long)]
        request_timeout_secs: Option<u64>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigView<'a> {
    state_dir: String,
    auto_update: bool,
    cooldown_hours: f64,
    #[serde(flatten)]
    config: &'a Config,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(state_dir: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(state_dir, json),
        ConfigSubcommand::Set {
            auto_update,
            cooldown_hours,
            url,
            dir,
            request_timeout_secs,
        } => {
            if let Some(hours) = cooldown_hours {
                if !hours.is_finite() || hours < 0.0 {
                    bail!("--cooldown-hours must be a non-negative number, got {hours}");
                }
            }
            if auto_update.is_some() || cooldown_hours.is_some() {
                set_schedule(state_dir, auto_update, cooldown_hours)?;
            }
            if url.is_some() || dir.is_some() || request_timeout_secs.is_some() {
                let mut config = Config::load(state_dir).context("failed to load config.yaml")?;
                if url.is_some() || dir.is_some() {
                    config.source.url = url;
                    config.source.dir = dir;
                }
                if let Some(secs) = request_timeout_secs {
                    config.request_timeout_secs = secs;
                }
                config.save(state_dir).context("failed to save config.yaml")?;
            }
            show(state_dir, json)
        }
    }
}

fn set_schedule(
    state_dir: &Path,
    auto_update: Option<bool>,
    cooldown_hours: Option<f64>,
) -> anyhow::Result<()> {
    let lock = sync::default_lock(state_dir);
    let _guard = LockGuard::try_acquire(&lock)
        .ok_or_else(|| anyhow!("another extsync run is in progress; try again shortly"))?;
    let mut state = GlobalSyncState::load_or_default(state_dir).context("failed to load state")?;
    if let Some(enabled) = auto_update {
        state.auto_update = enabled;
    }
    if let Some(hours) = cooldown_hours {
        state.cooldown_hours = hours;
    }
    state.save(state_dir).context("failed to save state")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(state_dir: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(state_dir).context("failed to load config.yaml")?;
    let state = GlobalSyncState::load_or_default(state_dir).context("failed to load state")?;

    if json {
        return print_json(&ConfigView {
            state_dir: state_dir.display().to_string(),
            auto_update: state.auto_update,
            cooldown_hours: state.cooldown_hours,
            config: &config,
        });
    }

    println!("state dir:       {}", state_dir.display());
    println!("auto-update:     {}", state.auto_update);
    println!("cooldown hours:  {}", state.cooldown_hours);
    let source = match (&config.source.url, &config.source.dir) {
        (Some(url), _) => url.clone(),
        (None, Some(dir)) => dir.display().to_string(),
        (None, None) => "(not configured)".to_string(),
    };
    println!("source:          {source}");
    println!("request timeout: {}s", config.request_timeout_secs);
    Ok(())
}
