// src/runner/mod.rs

//! Run orchestration.
//!
//! - [`orchestrator`] drives one run: sends cases, drains messages, judges
//!   answers and reports progress.
//! - [`directory`] adds directory mode on top of the per-file driver.
//! - [`state`] is the per-run state machine.
//! - [`outcome`] holds the result types handed to the presenter.

pub mod directory;
pub mod orchestrator;
pub mod outcome;
pub mod state;

pub use orchestrator::{CaseSelection, Orchestrator, RunSettings};
pub use outcome::{
    CaseOutcome, CaseStatus, CaseVerdict, DirectorySummary, FileOutcome, GroupTally, PartOutcome,
    PartVerdict, RunOutcome,
};
pub use state::{RunPhase, RunState};
