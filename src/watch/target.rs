// src/watch/target.rs

//! Mapping a path (from the command line or a change event) to a run target.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::RunTarget;
use crate::watch::patterns::{collect_source_files, SourcePatterns};

#[derive(Debug, Clone)]
pub struct TargetResolver {
    fs: Arc<dyn FileSystem>,
    patterns: Arc<SourcePatterns>,
}

impl TargetResolver {
    pub fn new(fs: Arc<dyn FileSystem>, patterns: Arc<SourcePatterns>) -> Self {
        Self { fs, patterns }
    }

    /// Target for an explicit path: a directory runs in directory mode, a
    /// source file runs on its own, anything else falls back to the most
    /// recently modified source.
    pub fn resolve(&self, path: &Path) -> Result<Option<RunTarget>> {
        if self.fs.is_dir(path) {
            return Ok(Some(RunTarget::Directory(path.to_path_buf())));
        }
        self.for_change(path)
    }

    /// Target for a changed file. Edits to non-source files (a shared helper,
    /// an input file) re-run the most recently modified source.
    pub fn for_change(&self, path: &Path) -> Result<Option<RunTarget>> {
        if self.fs.is_file(path) && self.patterns.is_source(path) {
            return Ok(Some(RunTarget::File(path.to_path_buf())));
        }

        let latest = self.most_recent_source()?;
        debug!(
            changed = %path.display(),
            fallback = ?latest,
            "changed path is not a source; using most recent source"
        );
        Ok(latest.map(RunTarget::File))
    }

    /// Most recently modified source under the watch root. Ties go to the
    /// later path in sort order.
    pub fn most_recent_source(&self) -> Result<Option<PathBuf>> {
        let files = collect_source_files(self.fs.as_ref(), self.patterns.root(), &self.patterns)?;
        let latest = files
            .into_iter()
            .filter_map(|p| self.fs.modified(&p).ok().map(|t| (t, p)))
            .max();
        Ok(latest.map(|(_, p)| p))
    }
}
