// src/present/mod.rs

//! Progress presentation boundary.
//!
//! The runner never prints directly; it emits [`ProgressEvent`]s to a
//! [`Presenter`]. [`console::ConsolePresenter`] is the plain stdout
//! implementation used by the binary, tests substitute a recording one.

pub mod console;

use std::path::PathBuf;

use crate::errors::RunFailure;
use crate::runner::outcome::{CaseOutcome, DirectorySummary, FileOutcome, GroupTally, PartOutcome};
use crate::types::RunTarget;

pub use console::ConsolePresenter;

/// Everything the presenter may be told about, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    RunStarted {
        target: RunTarget,
    },
    FileStarted {
        source: PathBuf,
    },
    CaseStarted {
        source: PathBuf,
        label: String,
    },
    /// Transient progress text from the child.
    Status {
        text: String,
    },
    /// A line of the child's stdout/stderr.
    Output {
        line: String,
    },
    PartFinished {
        label: String,
        outcome: PartOutcome,
    },
    CaseFinished {
        source: PathBuf,
        outcome: CaseOutcome,
    },
    /// The one terminal marker for a unit of work that did not complete.
    Failure {
        source: PathBuf,
        failure: RunFailure,
    },
    FileFinished {
        outcome: FileOutcome,
    },
    GroupProgress {
        group: String,
        tally: GroupTally,
    },
    DirectoryFinished {
        summary: DirectorySummary,
    },
    /// The run was superseded; nothing after this belongs to it.
    RunCancelled {
        target: RunTarget,
    },
}

/// Sink for progress events.
pub trait Presenter: Send + Sync {
    fn present(&self, event: ProgressEvent);
}
