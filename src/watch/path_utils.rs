// src/watch/path_utils.rs

//! Path display helpers for reporting watched files.

use std::path::Path;

/// Render `path` relative to `root` with forward slashes, falling back to the
/// full path when the two cannot be related.
///
/// Symlinked prefixes (macOS `/var` vs `/private/var`) are handled by retrying
/// with both paths canonicalized.
pub fn display_relative(root: &Path, path: &Path) -> String {
    if let Ok(rel) = path.strip_prefix(root) {
        return slashed(rel);
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return slashed(rel);
        }
    }

    path.display().to_string()
}

fn slashed(rel: &Path) -> String {
    if rel.as_os_str().is_empty() {
        return ".".to_string();
    }
    rel.to_string_lossy().replace('\\', "/")
}
