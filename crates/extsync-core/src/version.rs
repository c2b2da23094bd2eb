//! Semantic-version ordering for the manifest gate.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Version {
    core: [u64; 3],
    pre: Vec<String>,
}

fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    let without_build = trimmed.split_once('+').map_or(trimmed, |(left, _)| left);
    let (core_str, pre_str) = match without_build.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (without_build, None),
    };
    if core_str.is_empty() {
        return None;
    }

    let mut core = [0u64; 3];
    let mut count = 0;
    for token in core_str.split('.') {
        if count == 3 {
            return None;
        }
        core[count] = token.parse::<u64>().ok()?;
        count += 1;
    }

    let pre = match pre_str {
        Some(p) if p.is_empty() => return None,
        Some(p) => p.split('.').map(str::to_string).collect(),
        None => Vec::new(),
    };
    Some(Version { core, pre })
}

fn compare_pre(a: &[String], b: &[String]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    for (left, right) in a.iter().zip(b) {
        let ord = match (left.parse::<u64>(), right.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => left.cmp(right),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Compare two version strings. `None` if either is not a version.
pub fn compare_versions(left: &str, right: &str) -> Option<Ordering> {
    let l = parse_version(left)?;
    let r = parse_version(right)?;
    Some(l.core.cmp(&r.core).then_with(|| compare_pre(&l.pre, &r.pre)))
}

/// Strict greater-than: true only when `remote` is a newer version than `local`.
///
/// An unparseable remote version is never newer. An unparseable local version
/// (hand-edited state) is treated as older than any valid remote.
pub fn is_newer(remote: &str, local: &str) -> bool {
    if parse_version(remote).is_none() {
        return false;
    }
    if parse_version(local).is_none() {
        return true;
    }
    compare_versions(remote, local) == Some(Ordering::Greater)
}
