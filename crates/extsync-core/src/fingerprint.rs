//! Content digests used to detect drift between recorded and on-disk state.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;

/// SHA-256 of `content`, lowercase hex.
pub fn fingerprint(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Fingerprint of the file at `path`, or `None` when it does not exist.
pub fn fingerprint_file(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(fingerprint(&bytes))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
