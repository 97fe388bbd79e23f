use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use solwatch::cases::CaseStore;
use solwatch::errors::RunFailure;
use solwatch::types::TestCase;

/// In-memory `CaseStore`. The group of a source is the name of its parent
/// directory, so `2015/day01.py` belongs to `2015`.
#[derive(Debug, Default)]
pub struct MemoryCaseStore {
    cases: Mutex<HashMap<PathBuf, Vec<TestCase>>>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source: impl Into<PathBuf>, cases: Vec<TestCase>) -> Self {
        self.insert(source, cases);
        self
    }

    pub fn insert(&self, source: impl Into<PathBuf>, cases: Vec<TestCase>) {
        self.cases.lock().unwrap().insert(source.into(), cases);
    }
}

impl CaseStore for MemoryCaseStore {
    fn load(&self, source: &Path) -> Result<Vec<TestCase>, RunFailure> {
        self.cases
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .ok_or_else(|| RunFailure::InputUnavailable(format!("no cases for {}", source.display())))
    }

    fn group_of(&self, source: &Path) -> Option<String> {
        source
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}
