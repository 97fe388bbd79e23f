// src/watch/hash.rs

//! Content hashing for `[watch].use_hash`.
//!
//! Editors often touch a file (or write it twice) without changing it. With
//! hashing enabled such events are dropped before they reach the controller.
//! Hashes live in memory only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 of a file's bytes, hex encoded.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Remembers the last seen hash per path.
#[derive(Debug)]
pub struct ContentFilter {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl ContentFilter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// True when the content differs from the last time this path was seen
    /// (or it was never seen). Unreadable paths always count as changed.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        let hash = match compute_file_hash(self.fs.as_ref(), path) {
            Ok(hash) => hash,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot hash; treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(path = %path.display(), "content unchanged");
                false
            }
            _ => true,
        }
    }

    /// Seed the cache without reporting a change (e.g. at startup).
    pub fn remember(&mut self, path: &Path) {
        if let Ok(hash) = compute_file_hash(self.fs.as_ref(), path) {
            self.hashes.insert(path.to_path_buf(), hash);
        }
    }
}
