pub mod backup;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod fingerprint;
pub mod hooks;
pub mod io;
pub mod lock;
pub mod manifest;
pub mod migrations;
pub mod paths;
pub mod post_update;
pub mod reconcile;
pub mod source;
pub mod state;
pub mod sync;
pub mod types;
pub mod version;

pub use error::{Result, SyncError};
