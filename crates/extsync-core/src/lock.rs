//! Advisory cross-process lock guarding a synchronization run.
//!
//! The lock is a marker file stamped with the owning process id. A marker older
//! than the staleness threshold is assumed to belong to a crashed process and is
//! reclaimed. This is not an OS-level lock: two processes that both observe a
//! stale marker can still race, which is accepted at this scale.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Age after which an existing marker is considered abandoned.
pub const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Narrow seam so the marker-file lock can be swapped for an OS-level one.
pub trait MutationLock {
    /// Try to take the lock. `false` means another run holds it.
    fn acquire(&self) -> bool;
    /// Drop the lock. Never fails.
    fn release(&self);
}

#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    stale_after: Duration,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stale_after: STALE_AFTER,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn marker_age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.path).ok()?.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }
}

impl MutationLock for FileLock {
    fn acquire(&self) -> bool {
        if let Some(age) = self.marker_age() {
            if age < self.stale_after {
                tracing::debug!(path = %self.path.display(), ?age, "sync lock held elsewhere");
                return false;
            }
            tracing::warn!(path = %self.path.display(), ?age, "reclaiming stale sync lock");
            let _ = fs::remove_file(&self.path);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && fs::create_dir_all(parent).is_err() {
                return false;
            }
        }

        match OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                true
            }
            // Another process created the marker between our check and create.
            Err(_) => false,
        }
    }

    fn release(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Holds a [`MutationLock`] for the lifetime of the guard.
pub struct LockGuard<'a, L: MutationLock + ?Sized> {
    lock: &'a L,
}

impl<'a, L: MutationLock + ?Sized> LockGuard<'a, L> {
    /// Acquire `lock`, returning `None` on contention.
    pub fn try_acquire(lock: &'a L) -> Option<Self> {
        lock.acquire().then_some(Self { lock })
    }
}

impl<L: MutationLock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
