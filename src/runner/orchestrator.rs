// src/runner/orchestrator.rs

//! Drives one logical run against a [`RunTarget`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cases::CaseStore;
use crate::channel::Recv;
use crate::config::ConfigFile;
use crate::errors::RunFailure;
use crate::exec::{ChildExit, ChildSession, Launcher};
use crate::fs::FileSystem;
use crate::present::{Presenter, ProgressEvent};
use crate::protocol::{Message, Request};
use crate::runner::outcome::{CaseStatus, FileOutcome, PartOutcome, PartVerdict, RunOutcome};
use crate::runner::state::RunState;
use crate::types::{answers_match, RunTarget, TestCase};
use crate::watch::SourcePatterns;

/// Timing and part selection for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub poll: Duration,
    pub exit: Duration,
    /// Run a single part (one-based) instead of all of them.
    pub part: Option<u32>,
}

impl RunSettings {
    pub fn from_config(cfg: &ConfigFile, part: Option<u32>) -> Self {
        Self {
            poll: cfg.timeouts.poll(),
            exit: cfg.timeouts.exit(),
            part,
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(200),
            exit: Duration::from_millis(5000),
            part: None,
        }
    }
}

/// Which cases of a file to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSelection {
    /// Examples, then the main case.
    All,
    /// Directory mode.
    MainOnly,
}

/// How draining one case ended.
#[derive(Debug)]
enum Drain {
    Done,
    Failed(RunFailure),
    Cancelled,
}

/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    launcher: Arc<dyn Launcher>,
    cases: Arc<dyn CaseStore>,
    presenter: Arc<dyn Presenter>,
    pub(crate) patterns: Arc<SourcePatterns>,
    pub(crate) fs: Arc<dyn FileSystem>,
    settings: RunSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("patterns", &self.patterns)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        launcher: Arc<dyn Launcher>,
        cases: Arc<dyn CaseStore>,
        presenter: Arc<dyn Presenter>,
        patterns: Arc<SourcePatterns>,
        fs: Arc<dyn FileSystem>,
        settings: RunSettings,
    ) -> Self {
        Self {
            launcher,
            cases,
            presenter,
            patterns,
            fs,
            settings,
        }
    }

    pub(crate) fn present(&self, event: ProgressEvent) {
        self.presenter.present(event);
    }

    /// Run `target` to completion or until `cancel` fires.
    ///
    /// On cancellation this returns only after the child has exited, and
    /// [`ProgressEvent::RunCancelled`] is the last event of the run.
    pub async fn run(&self, target: RunTarget, cancel: CancellationToken) -> RunOutcome {
        info!(target = %target, "run started");
        self.present(ProgressEvent::RunStarted {
            target: target.clone(),
        });

        let outcome = match &target {
            RunTarget::File(source) => RunOutcome::File(
                self.run_file(source, CaseSelection::All, &cancel).await,
            ),
            RunTarget::Directory(dir) => {
                RunOutcome::Directory(self.run_directory(dir, &cancel).await)
            }
        };

        if outcome.is_cancelled() {
            info!(target = %target, "run cancelled");
            self.present(ProgressEvent::RunCancelled { target });
        } else {
            info!(target = %target, "run finished");
        }
        outcome
    }

    /// Run the selected cases of one source file in a single child.
    ///
    /// Emits `FileStarted`, per-case events, at most one `Failure` and a
    /// closing `FileFinished`. A cancelled file emits nothing after the
    /// cancellation is observed.
    pub async fn run_file(
        &self,
        source: &Path,
        selection: CaseSelection,
        cancel: &CancellationToken,
    ) -> FileOutcome {
        let source_buf = source.to_path_buf();
        let mut outcome = FileOutcome::new(source_buf.clone(), self.cases.group_of(source));
        self.present(ProgressEvent::FileStarted {
            source: source_buf.clone(),
        });

        let mut cases = match self.cases.load(source) {
            Ok(cases) => cases,
            Err(failure) => return self.fail_file(outcome, failure),
        };
        if selection == CaseSelection::MainOnly {
            cases.retain(|c| !c.example);
        }
        if cases.is_empty() {
            let failure = RunFailure::InputUnavailable(format!(
                "no cases for {}",
                source.display()
            ));
            return self.fail_file(outcome, failure);
        }

        if cancel.is_cancelled() {
            outcome.failure = Some(RunFailure::Cancelled);
            return outcome;
        }

        // Launch is bounded by the connect timeout, so it is not raced
        // against the token: the child handle must come back to be stopped.
        let mut session = match self.launcher.launch(source).await {
            Ok(session) => session,
            Err(failure) => return self.fail_file(outcome, failure),
        };
        debug!(source = %source.display(), pid = ?session.child.id(), "session established");

        let mut state = RunState::new(cancel.clone());
        let failure = self
            .drive_cases(source, &cases, &mut session, &mut state)
            .await;

        outcome.cases = state.into_outcomes();
        match failure {
            Some(RunFailure::Cancelled) => {
                outcome.failure = Some(RunFailure::Cancelled);
                outcome
            }
            Some(failure) => {
                // The case that was running already carries the failure.
                outcome.failure = Some(failure.clone());
                self.report_failure(&source_buf, failure);
                self.present(ProgressEvent::FileFinished {
                    outcome: outcome.clone(),
                });
                outcome
            }
            None => {
                self.present(ProgressEvent::FileFinished {
                    outcome: outcome.clone(),
                });
                outcome
            }
        }
    }

    /// Send every case in order and drain it. Returns the failure that ended
    /// the file early, if any. The child is gone when this returns.
    async fn drive_cases(
        &self,
        source: &Path,
        cases: &[TestCase],
        session: &mut ChildSession,
        state: &mut RunState,
    ) -> Option<RunFailure> {
        let mut example_no = 0;
        let last = cases.len() - 1;

        for (index, case) in cases.iter().enumerate() {
            let label = if case.example {
                example_no += 1;
                format!("example {example_no}")
            } else {
                "main".to_string()
            };

            if !state.begin_case(label.clone(), case.example) {
                warn!(source = %source.display(), case = %label, "case out of order; skipped");
                continue;
            }
            self.present(ProgressEvent::CaseStarted {
                source: source.to_path_buf(),
                label: label.clone(),
            });
            debug!(source = %source.display(), case = %label, "sending case");

            let drained = match session
                .connection
                .send_request(Request::for_case(case, self.settings.part))
                .await
            {
                Ok(()) => self.drain_case(session, state, case, &label).await,
                Err(_) => Drain::Failed(self.exit_failure(session).await),
            };

            match drained {
                Drain::Done if index < last => {
                    state.set_status(CaseStatus::Completed);
                    self.finish_case(source, state);
                }
                Drain::Done => {
                    state.set_status(CaseStatus::Completed);
                    let failure = self.close_session(source, session, state).await;
                    if failure == Some(RunFailure::Cancelled) {
                        state.mark_cancelled();
                        session.connection.discard_pending();
                        return failure;
                    }
                    self.finish_case(source, state);
                    state.finish();
                    return failure;
                }
                Drain::Failed(failure) => {
                    warn!(source = %source.display(), case = %label, error = %failure, "case failed");
                    state.fail_current(failure.clone());
                    session.child.terminate().await;
                    self.finish_case(source, state);
                    return Some(failure);
                }
                Drain::Cancelled => {
                    debug!(source = %source.display(), case = %label, "cancellation observed");
                    state.mark_cancelled();
                    session.child.terminate().await;
                    let dropped = session.connection.discard_pending();
                    debug!(dropped, "discarded messages of cancelled run");
                    return Some(RunFailure::Cancelled);
                }
            }
        }

        // Only reachable when every case was skipped.
        session.child.terminate().await;
        None
    }

    /// Consume messages for the current case until `done`, a disconnect, the
    /// child's death or cancellation.
    async fn drain_case(
        &self,
        session: &mut ChildSession,
        state: &mut RunState,
        case: &TestCase,
        label: &str,
    ) -> Drain {
        let cancel = state.cancel_token().clone();
        let mut exited = false;

        loop {
            let recv = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Drain::Cancelled,
                recv = session.connection.recv_timeout(self.settings.poll) => recv,
            };

            match recv {
                Recv::Message(Message::Status { text }) => {
                    self.present(ProgressEvent::Status { text });
                }
                Recv::Message(Message::Result {
                    answer,
                    duration,
                    aside,
                }) => {
                    let part = self.judge(state.part_index(), case, answer, duration, aside);
                    self.present(ProgressEvent::PartFinished {
                        label: label.to_string(),
                        outcome: part.clone(),
                    });
                    state.record_part(part);
                }
                Recv::Message(Message::Done) => return Drain::Done,
                Recv::Closed => return Drain::Failed(self.exit_failure(session).await),
                Recv::TimedOut => {
                    // One more poll after the exit is seen picks up anything
                    // the reader had not queued yet.
                    if exited {
                        return Drain::Failed(self.exit_failure(session).await);
                    }
                    exited = session.child.try_exit().is_some();
                }
            }
        }
    }

    /// Positional comparison; with `--part N` result `i` is compared with
    /// expected answer `N - 1 + i`.
    fn judge(
        &self,
        index: usize,
        case: &TestCase,
        answer: Value,
        duration: Duration,
        aside: Option<crate::protocol::Aside>,
    ) -> PartOutcome {
        let offset = self
            .settings
            .part
            .map(|p| p.saturating_sub(1) as usize)
            .unwrap_or(0);
        let slot = offset + index;
        let expected = case.expected(slot).cloned();
        let verdict = match &expected {
            Some(exp) if answers_match(&answer, exp) => PartVerdict::Pass,
            Some(_) => PartVerdict::Fail,
            None => PartVerdict::Informational,
        };

        PartOutcome {
            part: u32::try_from(slot + 1).unwrap_or(u32::MAX),
            answer,
            expected,
            duration,
            aside,
            verdict,
        }
    }

    /// Tell the child we are done and wait (bounded) for it to exit. A
    /// non-zero exit turns the last case into an error.
    async fn close_session(
        &self,
        source: &Path,
        session: &mut ChildSession,
        state: &mut RunState,
    ) -> Option<RunFailure> {
        if session.connection.send_done().await.is_err() {
            debug!(source = %source.display(), "child closed before final done");
        }

        let cancel = state.cancel_token().clone();
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            exit = session.child.wait_for(self.settings.exit) => Some(exit),
        };

        let exit = match waited {
            None => {
                session.child.terminate().await;
                return Some(RunFailure::Cancelled);
            }
            Some(Some(exit)) => exit,
            Some(None) => {
                warn!(
                    source = %source.display(),
                    pid = ?session.child.id(),
                    timeout_ms = self.settings.exit.as_millis() as u64,
                    "child did not exit after done; terminating"
                );
                session.child.terminate().await
            }
        };

        match exit {
            ChildExit::Failed(code) => {
                let failure = RunFailure::ChildExitedNonZero(code);
                state.fail_current(failure.clone());
                Some(failure)
            }
            ChildExit::Success | ChildExit::Terminated => None,
        }
    }

    /// Explain a lost connection: prefer the exit code when there is one.
    async fn exit_failure(&self, session: &mut ChildSession) -> RunFailure {
        match session.child.wait_for(self.settings.poll).await {
            Some(ChildExit::Failed(code)) => RunFailure::ChildExitedNonZero(code),
            _ => RunFailure::Disconnected,
        }
    }

    fn finish_case(&self, source: &Path, state: &RunState) {
        if let Some(case) = state.current() {
            self.present(ProgressEvent::CaseFinished {
                source: source.to_path_buf(),
                outcome: case.clone(),
            });
        }
    }

    fn report_failure(&self, source: &Path, failure: RunFailure) {
        self.present(ProgressEvent::Failure {
            source: source.to_path_buf(),
            failure,
        });
    }

    fn fail_file(&self, mut outcome: FileOutcome, failure: RunFailure) -> FileOutcome {
        warn!(source = %outcome.source.display(), error = %failure, "file run failed");
        outcome.failure = Some(failure.clone());
        self.report_failure(&outcome.source, failure);
        self.present(ProgressEvent::FileFinished {
            outcome: outcome.clone(),
        });
        outcome
    }
}
