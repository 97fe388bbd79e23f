// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// Compiled glob patterns for one runner.
#[derive(Clone)]
struct RunnerProfile {
    name: String,
    set: GlobSet,
}

/// Decides which paths are solution sources and which runner handles them.
///
/// Patterns are relative to the watch root. A path matches when some runner
/// glob matches it and no `[watch].exclude` glob does. Runners are tried in
/// config (name) order; the first match wins.
#[derive(Clone)]
pub struct SourcePatterns {
    root: PathBuf,
    runners: Vec<RunnerProfile>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for SourcePatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.runners.iter().map(|r| r.name.as_str()).collect();
        f.debug_struct("SourcePatterns")
            .field("root", &self.root)
            .field("runners", &names)
            .finish_non_exhaustive()
    }
}

impl SourcePatterns {
    /// Compile the runner and exclude globs from a loaded config.
    pub fn from_config(root: impl Into<PathBuf>, cfg: &ConfigFile) -> Result<Self> {
        let mut runners = Vec::with_capacity(cfg.runners().len());
        for (name, runner) in cfg.runners().iter() {
            let set = build_globset(&runner.patterns)
                .with_context(|| format!("building globset for runner {name}"))?;
            runners.push(RunnerProfile {
                name: name.clone(),
                set,
            });
        }

        let exclude_set = if cfg.watch.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&cfg.watch.exclude).context("building exclude globset")?)
        };

        Ok(Self {
            root: root.into(),
            runners,
            exclude_set,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when the root-relative path is excluded from watching.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    /// Name of the runner responsible for a root-relative path, if any.
    pub fn runner_for_rel(&self, rel_path: &str) -> Option<&str> {
        if self.is_excluded(rel_path) {
            return None;
        }
        self.runners
            .iter()
            .find(|r| r.set.is_match(rel_path))
            .map(|r| r.name.as_str())
    }

    /// Same as [`Self::runner_for_rel`] for a path that may be absolute or
    /// relative to the current directory.
    pub fn runner_for(&self, path: &Path) -> Option<&str> {
        match relative_str(&self.root, path) {
            Some(rel) => self.runner_for_rel(&rel),
            None => self.runner_for_rel(&path.to_string_lossy().replace('\\', "/")),
        }
    }

    pub fn is_source(&self, path: &Path) -> bool {
        self.runner_for(path).is_some()
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect every source file under `dir`, sorted by path.
pub fn collect_source_files(
    fs: &dyn FileSystem,
    dir: &Path,
    patterns: &SourcePatterns,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        for path in fs.read_dir(&current)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) && patterns.is_source(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
