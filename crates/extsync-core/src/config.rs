use crate::error::Result;
use crate::paths;
use crate::source::{DirSource, ExtensionSource, HttpSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Where extensions are published. `url` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl SourceConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.dir.is_some()
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load `config.yaml` from the state directory, falling back to defaults.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = paths::config_path(state_dir);
        match crate::io::read_optional(&path)? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = paths::config_path(state_dir);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the configured source, or `None` when no source is set.
    pub fn build_source(&self) -> Result<Option<Box<dyn ExtensionSource>>> {
        if let Some(url) = &self.source.url {
            return Ok(Some(Box::new(HttpSource::new(url, self.request_timeout())?)));
        }
        Ok(self
            .source
            .dir
            .as_ref()
            .map(|dir| Box::new(DirSource::new(dir.clone())) as Box<dyn ExtensionSource>))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
