// src/runner/outcome.rs

//! Results of a run, as handed to the presenter.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::errors::RunFailure;
use crate::protocol::Aside;

/// Verdict for a single reported part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartVerdict {
    Pass,
    Fail,
    /// No expected answer is known; shown but never counted as failing.
    Informational,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartOutcome {
    /// One-based part number.
    pub part: u32,
    pub answer: Value,
    pub expected: Option<Value>,
    pub duration: Duration,
    pub aside: Option<Aside>,
    pub verdict: PartVerdict,
}

/// How a case ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseStatus {
    /// The child sent `done` for this case and did not fail afterwards.
    Completed,
    Failed(RunFailure),
    Cancelled,
}

/// Overall verdict for a case, folding the status into the part verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseVerdict {
    Pass,
    Fail,
    Informational,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    /// `example 1`, `example 2`, ..., `main`.
    pub label: String,
    pub example: bool,
    /// Parts in the order the child reported them.
    pub parts: Vec<PartOutcome>,
    pub status: CaseStatus,
}

impl CaseOutcome {
    pub fn new(label: impl Into<String>, example: bool) -> Self {
        Self {
            label: label.into(),
            example,
            parts: Vec::new(),
            status: CaseStatus::Completed,
        }
    }

    pub fn verdicts(&self) -> Vec<PartVerdict> {
        self.parts.iter().map(|p| p.verdict).collect()
    }

    /// A failed status (non-zero exit, disconnect, ...) overrides any part
    /// that passed.
    pub fn verdict(&self) -> CaseVerdict {
        match &self.status {
            CaseStatus::Cancelled => CaseVerdict::Cancelled,
            CaseStatus::Failed(RunFailure::Cancelled) => CaseVerdict::Cancelled,
            CaseStatus::Failed(_) => CaseVerdict::Error,
            CaseStatus::Completed => {
                let verdicts = self.verdicts();
                if verdicts.contains(&PartVerdict::Fail) {
                    CaseVerdict::Fail
                } else if verdicts.contains(&PartVerdict::Pass) {
                    CaseVerdict::Pass
                } else {
                    CaseVerdict::Informational
                }
            }
        }
    }

    /// Parts that matched a known answer. Zero when the case errored.
    pub fn correct_parts(&self) -> usize {
        if self.status != CaseStatus::Completed {
            return 0;
        }
        self.parts
            .iter()
            .filter(|p| p.verdict == PartVerdict::Pass)
            .count()
    }
}

/// Everything that happened for one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// Grouping key (e.g. the year) used by directory summaries.
    pub group: Option<String>,
    pub cases: Vec<CaseOutcome>,
    /// Set when the file's run stopped before all of its cases ran.
    pub failure: Option<RunFailure>,
}

impl FileOutcome {
    pub fn new(source: PathBuf, group: Option<String>) -> Self {
        Self {
            source,
            group,
            cases: Vec::new(),
            failure: None,
        }
    }

    pub fn main_case(&self) -> Option<&CaseOutcome> {
        self.cases.iter().find(|c| !c.example)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.failure, Some(RunFailure::Cancelled))
            || self.cases.iter().any(|c| c.verdict() == CaseVerdict::Cancelled)
    }

    /// No failure marker and no failing or erroring case.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
            && self.cases.iter().all(|c| {
                matches!(c.verdict(), CaseVerdict::Pass | CaseVerdict::Informational)
            })
    }

    /// Correct parts of the main case; examples never count.
    pub fn correct_parts(&self) -> usize {
        self.main_case().map(CaseOutcome::correct_parts).unwrap_or(0)
    }
}

/// Per-group running tally in directory mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupTally {
    pub files: usize,
    pub failed_files: usize,
    pub correct_parts: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectorySummary {
    pub root: PathBuf,
    pub groups: BTreeMap<String, GroupTally>,
    pub files: Vec<FileOutcome>,
    /// The file list was cut short by a cancellation.
    pub cancelled: bool,
}

impl DirectorySummary {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Fold a finished file into the summary and return the updated tally of
    /// its group.
    pub fn record(&mut self, outcome: FileOutcome) -> GroupTally {
        let key = outcome.group.clone().unwrap_or_else(|| "other".to_string());
        let tally = self.groups.entry(key).or_default();
        tally.files += 1;
        tally.correct_parts += outcome.correct_parts();
        if !outcome.is_success() {
            tally.failed_files += 1;
        }
        let snapshot = *tally;
        self.files.push(outcome);
        snapshot
    }

    pub fn total_correct_parts(&self) -> usize {
        self.groups.values().map(|t| t.correct_parts).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    File(FileOutcome),
    Directory(DirectorySummary),
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        match self {
            RunOutcome::File(f) => f.is_cancelled(),
            RunOutcome::Directory(d) => d.cancelled,
        }
    }
}
