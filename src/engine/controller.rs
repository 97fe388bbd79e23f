// src/engine/controller.rs

use std::fmt;
use std::path::Path;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::runner::{Orchestrator, RunOutcome};
use crate::types::RunTarget;
use crate::watch::path_utils::relative_str;
use crate::watch::{ContentFilter, Debouncer, SourcePatterns, TargetResolver};

/// The one run in flight.
#[derive(Debug)]
pub struct ActiveRun {
    pub target: RunTarget,
    cancel: CancellationToken,
    handle: JoinHandle<RunOutcome>,
}

impl ActiveRun {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Owns the single-flight slot.
///
/// A new run is only started after the previous one has been cancelled and
/// its task has returned, which in turn only happens once its child exited.
pub struct WatchController {
    debouncer: Debouncer,
    filter: Option<ContentFilter>,
    resolver: TargetResolver,
    orchestrator: Orchestrator,
    active: Option<ActiveRun>,
}

impl fmt::Debug for WatchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchController")
            .field("debouncer", &self.debouncer)
            .field("use_hash", &self.filter.is_some())
            .field("active", &self.active.as_ref().map(|a| &a.target))
            .finish_non_exhaustive()
    }
}

impl WatchController {
    pub fn new(
        orchestrator: Orchestrator,
        resolver: TargetResolver,
        debouncer: Debouncer,
        filter: Option<ContentFilter>,
    ) -> Self {
        Self {
            debouncer,
            filter,
            resolver,
            orchestrator,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&ActiveRun> {
        self.active.as_ref()
    }

    fn patterns(&self) -> &SourcePatterns {
        &self.orchestrator.patterns
    }

    /// React to a change notification. Returns the target of the run that
    /// was started, if any.
    pub async fn handle_change(&mut self, path: &Path, now: Instant) -> Option<RunTarget> {
        if let Some(rel) = relative_str(self.patterns().root(), path) {
            if self.patterns().is_excluded(&rel) {
                debug!(path = %rel, "ignoring excluded path");
                return None;
            }
        }

        if !self.debouncer.should_act(path, now) {
            debug!(path = %path.display(), "debounced");
            return None;
        }

        if let Some(filter) = self.filter.as_mut() {
            if !filter.has_changed(path) {
                return None;
            }
        }

        // Resolve before touching the active run so an unresolvable event
        // leaves it alone.
        let target = match self.resolver.for_change(path) {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!(path = %path.display(), "no source to run");
                return None;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not resolve run target");
                return None;
            }
        };

        self.start(target.clone()).await;
        Some(target)
    }

    /// Cancel whatever is running, wait for it, then start `target`.
    pub async fn start(&mut self, target: RunTarget) {
        self.cancel_active().await;

        info!(target = %target, "starting run");
        let cancel = CancellationToken::new();
        let orchestrator = self.orchestrator.clone();
        let token = cancel.clone();
        let run_target = target.clone();
        let handle = tokio::spawn(async move { orchestrator.run(run_target, token).await });

        self.active = Some(ActiveRun {
            target,
            cancel,
            handle,
        });
    }

    /// Cancel the active run (if any) and wait for it to wind down.
    /// Calling this again, or with nothing running, is a no-op.
    pub async fn cancel_active(&mut self) -> Option<RunOutcome> {
        let active = self.active.take()?;
        if !active.is_finished() {
            debug!(target = %active.target, "cancelling active run");
        }
        active.cancel.cancel();

        match active.handle.await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(target = %active.target, error = %err, "run task failed");
                None
            }
        }
    }

    /// Wait for the active run to finish on its own.
    pub async fn wait_active(&mut self) -> Option<RunOutcome> {
        let active = self.active.take()?;
        match active.handle.await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(target = %active.target, error = %err, "run task failed");
                None
            }
        }
    }

    pub async fn shutdown(&mut self) {
        if self.cancel_active().await.is_some() {
            info!("active run stopped for shutdown");
        }
    }
}
