//! Plug-in source path normalization

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical form of `path` when it exists, otherwise the path as given.
pub fn normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Paths listed in environment variable `var`, OS separator aware.
pub fn environment_paths(var: &str) -> Vec<PathBuf> {
    std::env::var_os(var)
        .map(|value| {
            std::env::split_paths(&value)
                .filter(|path| !path.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize and drop repeats, keeping the first occurrence.
pub fn dedup(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut unique = Vec::new();
    for path in paths {
        let normalized = normalize(&path);
        if seen.insert(normalized.clone()) {
            unique.push(normalized);
        } else {
            debug!(path = %normalized.display(), "Skipping duplicate plug-in path");
        }
    }
    unique
}
