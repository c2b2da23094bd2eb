//! Where extension manifests and files come from.
//!
//! The engine only sees [`ExtensionSource`]. Two implementations ship: an HTTP
//! source (`<base>/<extension>/<path>`) and a local checkout with the same layout.

use crate::error::{Result, SyncError};
use crate::manifest::{RemoteManifest, MANIFEST_FILE};
use crate::paths;
use std::path::PathBuf;
use std::time::Duration;

pub trait ExtensionSource {
    /// Fetch the manifest of `extension`. `Ok(None)` when it is not published.
    fn fetch_manifest(&self, extension: &str) -> Result<Option<RemoteManifest>>;

    /// Fetch one file of `extension` by its path relative to the extension root.
    fn fetch_file(&self, extension: &str, relative: &str) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("extsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, extension: &str, relative: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            extension,
            relative.trim_start_matches('/')
        )
    }

    fn get_text(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::Fetch(format!("{url}: HTTP {status}")));
        }
        Ok(Some(response.text()?))
    }
}

impl ExtensionSource for HttpSource {
    fn fetch_manifest(&self, extension: &str) -> Result<Option<RemoteManifest>> {
        let url = self.url(extension, MANIFEST_FILE);
        match self.get_text(&url)? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn fetch_file(&self, extension: &str, relative: &str) -> Result<Option<String>> {
        self.get_text(&self.url(extension, relative))
    }
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

/// A checkout laid out as `<root>/<extension>/extension.json` plus its files.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExtensionSource for DirSource {
    fn fetch_manifest(&self, extension: &str) -> Result<Option<RemoteManifest>> {
        let path = paths::resolve_within(&self.root, &format!("{extension}/{MANIFEST_FILE}"))?;
        match crate::io::read_optional(&path)? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn fetch_file(&self, extension: &str, relative: &str) -> Result<Option<String>> {
        let ext_root = paths::resolve_within(&self.root, extension)?;
        let path = paths::resolve_within(&ext_root, relative)?;
        crate::io::read_optional(&path)
    }
}
