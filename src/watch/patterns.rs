// src/watch/patterns.rs

//! Resolving Watch patterns into concrete paths.
//!
//! Patterns use `*`, `?` and `[...]` within a single path component, plus
//! `**` for "any depth". Resolution happens once, when a task's watch loop
//! is set up, not per event.
//!
//! A `**` pattern is split on `**`; each segment is globbed relative to the
//! hits of the previous one, and every hit is walked recursively before the
//! next segment is applied. A leading `**` starts from the base directory.
//! Hits are de-duplicated, keeping first-seen order.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Resolve every pattern relative to `base` and return the de-duplicated set
/// of existing paths, in pattern order.
pub fn resolve_patterns(fs: &dyn FileSystem, base: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for pattern in patterns {
        let hits = if pattern.contains("**") {
            double_glob(fs, base, pattern)
        } else {
            glob(fs, base, pattern)
        };
        if hits.is_empty() {
            debug!(pattern = %pattern, "watch pattern matched nothing");
        }
        for hit in hits {
            if seen.insert(hit.clone()) {
                resolved.push(hit);
            }
        }
    }

    resolved
}

fn double_glob(fs: &dyn FileSystem, base: &Path, pattern: &str) -> Vec<PathBuf> {
    let mut prefixes = vec![String::new()];

    for (i, segment) in pattern.split("**").enumerate() {
        let segment = if i == 0 && segment.is_empty() { "./" } else { segment };

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for prefix in &prefixes {
            for path in glob(fs, base, &format!("{prefix}{segment}")) {
                walk(fs, &path, &mut |p| {
                    if seen.insert(p.to_path_buf()) {
                        hits.push(p.to_path_buf());
                    }
                });
            }
        }

        prefixes = hits
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }

    prefixes.into_iter().map(PathBuf::from).collect()
}

/// Visit `root` and everything below it, depth first, entries sorted.
fn walk(fs: &dyn FileSystem, root: &Path, visit: &mut dyn FnMut(&Path)) {
    let mut visited_dirs = HashSet::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(path) = stack.pop() {
        visit(&path);
        if !fs.is_dir(&path) {
            continue;
        }
        // Symlinked directories can loop back on themselves.
        let key = fs.canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !visited_dirs.insert(key) {
            continue;
        }
        match fs.read_dir(&path) {
            Ok(entries) => stack.extend(entries.into_iter().rev()),
            Err(err) => debug!(path = %path.display(), error = %err, "skipping unreadable directory"),
        }
    }
}

/// Single-level glob: wildcards only match within one path component.
fn glob(fs: &dyn FileSystem, base: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = base.join(pattern);
    if !has_meta(pattern) {
        return if fs.exists(&full) {
            vec![lexical_clean(&full)]
        } else {
            Vec::new()
        };
    }

    let mut candidates = vec![if full.is_absolute() {
        PathBuf::new()
    } else {
        PathBuf::from(".")
    }];

    for component in full.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                if !has_meta(&part) {
                    for candidate in &mut candidates {
                        candidate.push(&*part);
                    }
                    continue;
                }
                let Some(matcher) = component_matcher(&part, pattern) else {
                    return Vec::new();
                };
                candidates = candidates
                    .iter()
                    .filter(|dir| fs.is_dir(dir))
                    .filter_map(|dir| fs.read_dir(dir).ok())
                    .flatten()
                    .filter(|entry| entry.file_name().is_some_and(|n| matcher.is_match(n)))
                    .collect();
            }
            Component::CurDir => {}
            other => {
                for candidate in &mut candidates {
                    candidate.push(other.as_os_str());
                }
            }
        }
    }

    candidates.retain(|c| fs.exists(c));
    candidates
}

fn component_matcher(part: &str, pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(part).literal_separator(true).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(err) => {
            warn!(pattern = %pattern, error = %err, "invalid watch pattern");
            None
        }
    }
}

fn has_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn lexical_clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
