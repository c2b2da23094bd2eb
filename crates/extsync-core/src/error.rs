use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("path '{path}' resolves outside project root {root}")]
    PathEscape { root: String, path: String },

    #[error("fetch failed for '{0}'")]
    Fetch(String),

    #[error("unknown platform '{0}': expected 'claude' or 'cursor'")]
    UnknownPlatform(String),

    #[error("post-update command failed: {0}")]
    PostUpdateFailed(String),

    /// Raised by a post-update command to abort the whole synchronization run.
    #[error("synchronization stopped: {0}")]
    StopPropagation(String),

    #[error("home directory not found: set HOME or EXTSYNC_HOME")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    /// Whether this error must cross every per-item handler and end the run.
    pub fn is_stop(&self) -> bool {
        matches!(self, SyncError::StopPropagation(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
