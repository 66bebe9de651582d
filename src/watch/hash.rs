// src/watch/hash.rs

//! Content hashing for the optional change filter.
//!
//! Polling reports a change whenever a file's modification time moves. With
//! `use_hash` enabled, the watch loop keeps a blake3 digest per watched file
//! and drops change events whose content is byte-for-byte the same.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hex digest of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs.open_read(path)?;
    std::io::copy(&mut reader, &mut hasher)
        .with_context(|| format!("hashing file {:?}", path))?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen digest per watched file.
#[derive(Debug)]
pub struct ContentCache {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, Option<String>>,
}

impl ContentCache {
    /// Hash every path now, so the first change event has a baseline.
    pub fn prime(fs: Arc<dyn FileSystem>, paths: &[PathBuf]) -> Self {
        let mut cache = Self {
            fs,
            hashes: HashMap::new(),
        };
        for path in paths {
            let hash = cache.hash(path);
            cache.hashes.insert(path.clone(), hash);
        }
        cache
    }

    /// Record the current digest of `path` and report whether it differs from
    /// the previous one. A file that becomes unreadable (deleted, permission
    /// denied) counts as changed once.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        let current = self.hash(path);
        let previous = self.hashes.insert(path.to_path_buf(), current.clone());
        let changed = previous.flatten() != current;
        debug!(path = %path.display(), changed, "content hash checked");
        changed
    }

    fn hash(&self, path: &Path) -> Option<String> {
        compute_file_hash(self.fs.as_ref(), path).ok()
    }
}
