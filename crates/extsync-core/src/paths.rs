use crate::error::{Result, SyncError};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

/// Environment variable that relocates the global state directory.
pub const HOME_ENV: &str = "EXTSYNC_HOME";

pub const STATE_DIR_NAME: &str = ".extsync";
pub const STATE_FILE: &str = "state.json";
pub const CONFIG_FILE: &str = "config.yaml";
pub const LOCK_FILE: &str = "sync.lock";
pub const REPORT_FILE: &str = "update-report.md";

/// Reserved root inside each project that mirrors backed-up user edits.
pub const OVERRIDES_DIR: &str = ".extsync/overrides";

pub const TOOLS_DIR: &str = "tools";

// ---------------------------------------------------------------------------
// Global state directory
// ---------------------------------------------------------------------------

/// Resolve the global state directory: `$EXTSYNC_HOME`, else `~/.extsync`.
pub fn state_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = home::home_dir().ok_or(SyncError::HomeNotFound)?;
    Ok(home.join(STATE_DIR_NAME))
}

pub fn state_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE)
}

pub fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE)
}

pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE)
}

pub fn report_path(state_dir: &Path) -> PathBuf {
    state_dir.join(REPORT_FILE)
}

// ---------------------------------------------------------------------------
// Project-relative helpers
// ---------------------------------------------------------------------------

pub fn override_root(project: &Path) -> PathBuf {
    project.join(OVERRIDES_DIR)
}

/// Resolve `relative` under `root`, refusing anything that would land outside it.
///
/// Resolution is lexical: `.` segments are dropped, `..` pops a segment and is
/// rejected once it would climb above `root`. Absolute paths and drive prefixes
/// are rejected outright. Directories under `root` that already exist are then
/// checked with symlinks followed, so a linked `.claude/` pointing elsewhere is
/// refused too.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let parts = lexical_parts(root, relative)?;
    let mut resolved = root.to_path_buf();
    for part in parts {
        resolved.push(part);
    }
    if !stays_inside_physically(root, &resolved)? {
        return Err(escape(root, relative));
    }
    Ok(resolved)
}

/// Canonical `/`-separated form of a project-relative path, used as the key
/// for managed file bookkeeping. `a/./b.md` and `a/x/../b.md` both become `a/b.md`.
pub fn normalize_relative(root: &Path, relative: &str) -> Result<String> {
    let parts = lexical_parts(root, relative)?;
    Ok(parts
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn escape(root: &Path, relative: &str) -> SyncError {
    SyncError::PathEscape {
        root: root.display().to_string(),
        path: relative.to_string(),
    }
}

fn lexical_parts<'a>(root: &Path, relative: &'a str) -> Result<Vec<&'a OsStr>> {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(escape(root, relative));
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape(root, relative)),
        }
    }
    if parts.is_empty() {
        return Err(escape(root, relative));
    }
    Ok(parts)
}

/// Canonicalize the deepest existing ancestor of `resolved` and compare it with
/// the canonical `root`. A missing `root` has nothing to follow yet.
fn stays_inside_physically(root: &Path, resolved: &Path) -> Result<bool> {
    let real_root = match root.canonicalize() {
        Ok(real) => real,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    for dir in resolved.ancestors().skip(1) {
        if dir == root {
            break;
        }
        match dir.canonicalize() {
            Ok(real) => return Ok(real.starts_with(&real_root)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_relative_paths() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            resolve_within(root, ".claude/commands/a.md").unwrap(),
            PathBuf::from("/tmp/proj/.claude/commands/a.md")
        );
        assert_eq!(
            resolve_within(root, "./tools/x/../x/run.py").unwrap(),
            PathBuf::from("/tmp/proj/tools/x/run.py")
        );
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        let root = Path::new("/tmp/proj");
        for bad in [
            "../outside.md",
            "a/../../outside.md",
            "/etc/passwd",
            "",
            ".",
            "a/..",
        ] {
            assert!(
                matches!(resolve_within(root, bad), Err(SyncError::PathEscape { .. })),
                "expected escape: {bad}"
            );
        }
    }

    #[test]
    fn normalizes_relative_keys() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            normalize_relative(root, ".claude/./commands/a.md").unwrap(),
            ".claude/commands/a.md"
        );
        assert_eq!(
            normalize_relative(root, "tools/x/../x//run.py").unwrap(),
            "tools/x/run.py"
        );
        assert!(normalize_relative(root, "../a.md").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_paths_through_symlinked_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join("proj");
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, project.join(".claude")).unwrap();

        assert!(matches!(
            resolve_within(&project, ".claude/commands/a.md"),
            Err(SyncError::PathEscape { .. })
        ));
        assert_eq!(
            resolve_within(&project, ".cursor/rules/a.mdc").unwrap(),
            project.join(".cursor/rules/a.mdc")
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_that_stays_inside_root_is_allowed() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join("proj");
        std::fs::create_dir_all(project.join("shared")).unwrap();
        std::os::unix::fs::symlink(project.join("shared"), project.join(".claude")).unwrap();

        assert!(resolve_within(&project, ".claude/commands/a.md").is_ok());
    }

    #[test]
    fn path_helpers() {
        let dir = Path::new("/home/u/.extsync");
        assert_eq!(state_path(dir), PathBuf::from("/home/u/.extsync/state.json"));
        assert_eq!(lock_path(dir), PathBuf::from("/home/u/.extsync/sync.lock"));
        assert_eq!(
            override_root(Path::new("/p")),
            PathBuf::from("/p/.extsync/overrides")
        );
    }
}
