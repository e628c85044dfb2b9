//! # Staticconf Utilities
//!
//! Hashing and path helpers shared by the change detectors and the loaders.
//!
//! # Best Practices
//!
//! - Uses SHA-2 for content digests
//! - Paths are made absolute and sorted so watch lists are deterministic

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Compute SHA-256 hash of content string
///
/// # Examples
///
/// ```
/// use utils::compute_content_hash;
///
/// let hash = compute_content_hash("hello world");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    compute_bytes_hash(content.as_bytes())
}

/// Compute SHA-256 hash of raw bytes, hex encoded.
#[must_use]
pub fn compute_bytes_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read a file and compute the digest of its contents.
pub fn compute_file_hash(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(compute_bytes_hash(&bytes))
}

/// Make every path absolute (relative to the current directory) and sort
/// them. Duplicates are removed.
pub fn absolute_sorted_paths<I, P>(paths: I) -> std::io::Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let cwd = std::env::current_dir()?;
    let mut out: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| {
            let p = p.as_ref();
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                cwd.join(p)
            }
        })
        .collect();
    out.sort();
    out.dedup();
    Ok(out)
}

/// Join a prefix and a key with a dot, skipping an empty prefix.
#[must_use]
pub fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
