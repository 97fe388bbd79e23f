// src/exec/supervisor.rs

//! Real child-process supervisor.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channel::ChannelServer;
use crate::config::{RunnerConfig, TimeoutSection};
use crate::errors::RunFailure;
use crate::exec::backend::{BoxFuture, ChildExit, ChildHandle, ChildSession, Launcher};
use crate::exec::command::{build_command, describe};
use crate::exec::passthrough::spawn_passthrough;
use crate::present::Presenter;
use crate::watch::SourcePatterns;

/// Spawns one child per run attempt and waits (bounded) for it to connect
/// to the channel server.
pub struct ProcessSupervisor {
    server: Arc<ChannelServer>,
    patterns: Arc<SourcePatterns>,
    runners: BTreeMap<String, RunnerConfig>,
    presenter: Arc<dyn Presenter>,
    timeouts: TimeoutSection,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("address", &self.server.address())
            .field("runners", &self.runners.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(
        server: Arc<ChannelServer>,
        patterns: Arc<SourcePatterns>,
        runners: BTreeMap<String, RunnerConfig>,
        presenter: Arc<dyn Presenter>,
        timeouts: TimeoutSection,
    ) -> Self {
        Self {
            server,
            patterns,
            runners,
            presenter,
            timeouts,
        }
    }

    async fn launch_inner(&self, source: &Path) -> Result<ChildSession, RunFailure> {
        let runner = self
            .patterns
            .runner_for(source)
            .and_then(|name| self.runners.get(name))
            .ok_or_else(|| {
                RunFailure::SpawnFailed(format!("no runner matches {}", source.display()))
            })?;

        let stale = self.server.discard_stale().await;
        if stale > 0 {
            debug!(stale, "dropped unclaimed connections before spawning");
        }

        let address = self.server.address().to_string();
        info!(
            source = %source.display(),
            cmd = %describe(runner, source, &address),
            "starting child process"
        );

        let mut child = build_command(runner, source, &address)
            .spawn()
            .map_err(|e| RunFailure::SpawnFailed(format!("{}: {e}", runner.cmd.join(" "))))?;

        let passthrough = spawn_passthrough(
            child.stdout.take(),
            child.stderr.take(),
            Arc::clone(&self.presenter),
        );
        let mut handle = SupervisedChild::new(child, passthrough, self.timeouts.terminate_grace());

        match self.server.next_connection(self.timeouts.connect()).await {
            Some(connection) => {
                debug!(pid = ?handle.id(), peer = %connection.peer(), "child connected");
                Ok(ChildSession {
                    connection,
                    child: Box::new(handle),
                })
            }
            None => {
                warn!(
                    source = %source.display(),
                    pid = ?handle.id(),
                    "child never connected; terminating"
                );
                handle.terminate().await;
                Err(RunFailure::TransportNeverEstablished(self.timeouts.connect()))
            }
        }
    }
}

impl Launcher for ProcessSupervisor {
    fn launch<'a>(&'a self, source: &'a Path) -> BoxFuture<'a, Result<ChildSession, RunFailure>> {
        Box::pin(self.launch_inner(source))
    }
}

/// Owned OS process plus the task forwarding its output.
pub struct SupervisedChild {
    child: Child,
    pid: Option<u32>,
    passthrough: Option<JoinHandle<()>>,
    grace: Duration,
    exit: Option<ChildExit>,
}

impl SupervisedChild {
    pub fn new(child: Child, passthrough: JoinHandle<()>, grace: Duration) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            passthrough: Some(passthrough),
            grace,
            exit: None,
        }
    }

    /// Join the passthrough so no output is presented after we return.
    ///
    /// Bounded: a grandchild holding the pipes open must not hang the run.
    async fn drain_output(&mut self) {
        let Some(mut task) = self.passthrough.take() else {
            return;
        };
        if timeout(self.grace, &mut task).await.is_err() {
            warn!(pid = ?self.pid, "output still open after exit; abandoning passthrough");
            task.abort();
        }
    }

    async fn wait_inner(&mut self, limit: Duration) -> Option<ChildExit> {
        if self.exit.is_none() {
            match timeout(limit, self.child.wait()).await {
                Ok(Ok(status)) => {
                    let exit = ChildExit::from_code(status.code());
                    info!(pid = ?self.pid, exit_code = ?status.code(), "child process exited");
                    self.exit = Some(exit);
                }
                Ok(Err(err)) => {
                    warn!(pid = ?self.pid, error = %err, "failed waiting for child process");
                    self.exit = Some(ChildExit::Failed(-1));
                }
                Err(_) => return None,
            }
        }
        self.drain_output().await;
        self.exit
    }

    async fn terminate_inner(&mut self) -> ChildExit {
        if self.exit.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit = Some(ChildExit::from_code(status.code()));
            }
        }

        if self.exit.is_none() {
            let asked = self.pid.map(request_stop).unwrap_or(false);
            debug!(pid = ?self.pid, graceful = asked, "terminating child process");

            let stopped = asked && matches!(timeout(self.grace, self.child.wait()).await, Ok(Ok(_)));
            if !stopped {
                if let Err(err) = self.child.kill().await {
                    warn!(pid = ?self.pid, error = %err, "failed to kill child process");
                }
            }
            self.exit = Some(ChildExit::Terminated);
        }

        self.drain_output().await;
        self.exit.unwrap_or(ChildExit::Terminated)
    }
}

impl ChildHandle for SupervisedChild {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn try_exit(&mut self) -> Option<ChildExit> {
        if self.exit.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit = Some(ChildExit::from_code(status.code()));
            }
        }
        self.exit
    }

    fn wait_for(&mut self, limit: Duration) -> BoxFuture<'_, Option<ChildExit>> {
        Box::pin(self.wait_inner(limit))
    }

    fn terminate(&mut self) -> BoxFuture<'_, ChildExit> {
        Box::pin(self.terminate_inner())
    }
}

/// Ask the process to stop (SIGTERM). Returns whether the signal was sent.
#[cfg(unix)]
fn request_stop(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match i32::try_from(pid) {
        Ok(raw) => kill(Pid::from_raw(raw), Signal::SIGTERM).is_ok(),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn request_stop(_pid: u32) -> bool {
    false
}
