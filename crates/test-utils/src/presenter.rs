use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use solwatch::errors::RunFailure;
use solwatch::present::{Presenter, ProgressEvent};
use solwatch::runner::PartVerdict;

/// Presenter that keeps every event for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// `(case label, verdict)` for every reported part, in order.
    pub fn part_verdicts(&self) -> Vec<(String, PartVerdict)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::PartFinished { label, outcome } => Some((label, outcome.verdict)),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(PathBuf, RunFailure)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Failure { source, failure } => Some((source, failure)),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Status { text } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn outputs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Output { line } => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled_runs(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::RunCancelled { .. }))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
