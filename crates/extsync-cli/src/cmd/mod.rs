pub mod config;
pub mod install;
pub mod status;
pub mod sync;

use anyhow::Context;
use extsync_core::config::Config;
use std::path::{Path, PathBuf};

/// Source settings given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct SourceOverride {
    pub url: Option<String>,
    pub dir: Option<PathBuf>,
}

/// Load `config.yaml` and apply command-line source overrides on top.
pub fn load_config(state_dir: &Path, overrides: &SourceOverride) -> anyhow::Result<Config> {
    let mut config = Config::load(state_dir).context("failed to load config.yaml")?;
    if overrides.url.is_some() || overrides.dir.is_some() {
        config.source.url = overrides.url.clone();
        config.source.dir = overrides.dir.clone();
    }
    Ok(config)
}
