//! Optional side effect an extension can declare to run after its files land.
//!
//! The manifest's `postUpdate` command runs through the platform shell inside the
//! project directory. It receives `EXTSYNC_PROJECT_DIR` and `EXTSYNC_PLATFORM`.
//! Exiting with [`STOP_EXIT_CODE`] aborts the whole synchronization run.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Result, SyncError};
use crate::manifest::RemoteManifest;
use crate::types::Platform;

/// `EX_TEMPFAIL`: the command asks for the run to stop.
pub const STOP_EXIT_CODE: i32 = 75;

pub trait PostUpdateHook {
    fn run(&self, manifest: &RemoteManifest, project: &Path, platform: Platform) -> Result<()>;
}

/// Does nothing. Used when post-update commands are disabled.
pub struct NoopPostUpdate;

impl PostUpdateHook for NoopPostUpdate {
    fn run(&self, _manifest: &RemoteManifest, _project: &Path, _platform: Platform) -> Result<()> {
        Ok(())
    }
}

/// Runs `postUpdate` with `sh -c` (or `cmd /C` on Windows).
pub struct ShellPostUpdate;

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

impl PostUpdateHook for ShellPostUpdate {
    fn run(&self, manifest: &RemoteManifest, project: &Path, platform: Platform) -> Result<()> {
        let Some(command) = manifest.post_update.as_deref() else {
            return Ok(());
        };

        tracing::debug!(command, project = %project.display(), "running post-update command");
        let output = shell(command)
            .current_dir(project)
            .env("EXTSYNC_PROJECT_DIR", project)
            .env("EXTSYNC_PLATFORM", platform.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SyncError::PostUpdateFailed(format!("{command}: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(0) => Ok(()),
            Some(STOP_EXIT_CODE) => Err(SyncError::StopPropagation(if stderr.is_empty() {
                command.to_string()
            } else {
                stderr
            })),
            _ => Err(SyncError::PostUpdateFailed(format!(
                "{command}: {}{}",
                output.status,
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!(": {stderr}")
                }
            ))),
        }
    }
}
