// src/runner/state.rs

//! Mutable bookkeeping for the run currently being driven.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::RunFailure;
use crate::runner::outcome::{CaseOutcome, CaseStatus, PartOutcome};

/// Per-file state machine:
/// `Idle -> RunningExamples -> RunningMain -> Done`, with `Cancelled`
/// reachable from every non-idle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    RunningExamples,
    RunningMain,
    Done,
    Cancelled,
}

impl RunPhase {
    fn can_enter(self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (Idle, RunningExamples | RunningMain) => true,
            (RunningExamples, RunningExamples | RunningMain | Done) => true,
            (RunningMain, Done) => true,
            (RunningExamples | RunningMain | Done, Cancelled) => true,
            _ => false,
        }
    }
}

/// Owned by the orchestrator task of one run; nothing else mutates it.
#[derive(Debug)]
pub struct RunState {
    phase: RunPhase,
    case_index: usize,
    part_index: usize,
    outcomes: Vec<CaseOutcome>,
    cancel: CancellationToken,
}

impl RunState {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            phase: RunPhase::Idle,
            case_index: 0,
            part_index: 0,
            outcomes: Vec::new(),
            cancel,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn case_index(&self) -> usize {
        self.case_index
    }

    /// Zero-based index of the next part result within the current case.
    pub fn part_index(&self) -> usize {
        self.part_index
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase == RunPhase::Cancelled || self.cancel.is_cancelled()
    }

    /// Returns false (and leaves the phase alone) for an illegal transition.
    pub fn transition(&mut self, next: RunPhase) -> bool {
        if !self.phase.can_enter(next) {
            debug!(from = ?self.phase, to = ?next, "ignoring illegal phase transition");
            return false;
        }
        self.phase = next;
        true
    }

    /// Open a new case. Examples must all come before the main case.
    pub fn begin_case(&mut self, label: impl Into<String>, example: bool) -> bool {
        let next = if example {
            RunPhase::RunningExamples
        } else {
            RunPhase::RunningMain
        };
        if !self.transition(next) {
            return false;
        }
        if !self.outcomes.is_empty() {
            self.case_index += 1;
        }
        self.part_index = 0;
        self.outcomes.push(CaseOutcome::new(label, example));
        true
    }

    pub fn current(&self) -> Option<&CaseOutcome> {
        self.outcomes.last()
    }

    pub fn record_part(&mut self, part: PartOutcome) {
        if let Some(case) = self.outcomes.last_mut() {
            case.parts.push(part);
            self.part_index += 1;
        }
    }

    pub fn set_status(&mut self, status: CaseStatus) {
        if let Some(case) = self.outcomes.last_mut() {
            case.status = status;
        }
    }

    /// Mark the in-progress case as failed.
    pub fn fail_current(&mut self, failure: RunFailure) {
        self.set_status(CaseStatus::Failed(failure));
    }

    pub fn mark_cancelled(&mut self) {
        if self.transition(RunPhase::Cancelled) {
            self.set_status(CaseStatus::Cancelled);
        }
    }

    pub fn finish(&mut self) -> bool {
        self.transition(RunPhase::Done)
    }

    pub fn into_outcomes(self) -> Vec<CaseOutcome> {
        self.outcomes
    }
}
