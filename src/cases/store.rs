// src/cases/store.rs

//! Filesystem-backed case store.
//!
//! Layout: `<dir>/<group>/<item>.json`
//!
//! ```json
//! {
//!   "args": {"steps": 10},
//!   "examples": [{"input": "1\n2\n", "answers": [3, null]}],
//!   "main": {"input_file": "day01.txt", "answers": [1234]}
//! }
//! ```
//!
//! `input_file` is resolved relative to the JSON file. File-level `args`
//! apply to every case unless the case overrides the same key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cases::{CaseKey, CaseKeyPattern, CaseStore};
use crate::errors::RunFailure;
use crate::fs::FileSystem;
use crate::types::{CaseArgs, TestCase};

#[derive(Debug, Deserialize)]
struct CaseFile {
    #[serde(default)]
    args: CaseArgs,
    #[serde(default)]
    examples: Vec<CaseEntry>,
    main: Option<CaseEntry>,
}

#[derive(Debug, Deserialize)]
struct CaseEntry {
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    input_file: Option<PathBuf>,
    #[serde(default)]
    answers: Vec<Option<Value>>,
    #[serde(default)]
    args: CaseArgs,
}

#[derive(Debug, Clone)]
pub struct FsCaseStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
    pattern: CaseKeyPattern,
}

impl FsCaseStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>, pattern: CaseKeyPattern) -> Self {
        Self {
            fs,
            dir: dir.into(),
            pattern,
        }
    }

    pub fn key(&self, source: &Path) -> Option<CaseKey> {
        self.pattern.key_of(source)
    }

    pub fn case_file(&self, key: &CaseKey) -> PathBuf {
        self.dir.join(&key.group).join(format!("{}.json", key.item))
    }

    fn read_entry(
        &self,
        entry: CaseEntry,
        shared: &CaseArgs,
        base: &Path,
        example: bool,
    ) -> Result<TestCase, RunFailure> {
        let input = match (entry.input, entry.input_file) {
            (Some(input), _) => input,
            (None, Some(file)) => {
                let path = base.join(file);
                self.fs.read_to_string(&path).map_err(|e| {
                    RunFailure::InputUnavailable(format!("{}: {e:#}", path.display()))
                })?
            }
            (None, None) => String::new(),
        };

        let mut args = shared.clone();
        args.extend(entry.args);

        Ok(TestCase {
            input,
            args,
            answers: entry.answers,
            example,
        })
    }
}

impl CaseStore for FsCaseStore {
    fn load(&self, source: &Path) -> Result<Vec<TestCase>, RunFailure> {
        let key = self.key(source).ok_or_else(|| {
            RunFailure::InputUnavailable(format!(
                "{} does not match the case path pattern",
                source.display()
            ))
        })?;

        let path = self.case_file(&key);
        debug!(source = %source.display(), case_file = %path.display(), "loading cases");

        let text = self
            .fs
            .read_to_string(&path)
            .map_err(|e| RunFailure::InputUnavailable(format!("{}: {e:#}", path.display())))?;
        let file: CaseFile = serde_json::from_str(&text)
            .map_err(|e| RunFailure::InputUnavailable(format!("{}: {e}", path.display())))?;

        let main = file.main.ok_or_else(|| {
            RunFailure::InputUnavailable(format!("{} has no main case", path.display()))
        })?;
        let base = path.parent().unwrap_or(Path::new("."));

        let mut cases = Vec::with_capacity(file.examples.len() + 1);
        for entry in file.examples {
            cases.push(self.read_entry(entry, &file.args, base, true)?);
        }
        cases.push(self.read_entry(main, &file.args, base, false)?);
        Ok(cases)
    }

    fn group_of(&self, source: &Path) -> Option<String> {
        self.key(source).map(|k| k.group)
    }
}
