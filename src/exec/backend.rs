// src/exec/backend.rs

//! Pluggable launcher abstraction.
//!
//! The orchestrator talks to a [`Launcher`] instead of spawning processes
//! itself. Production code uses [`crate::exec::ProcessSupervisor`]; tests
//! provide a launcher whose "children" are scripted tasks speaking over an
//! in-memory [`Connection`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use crate::channel::Connection;
use crate::errors::RunFailure;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Success,
    /// Non-zero exit code (`-1` when no code is available, e.g. a signal).
    Failed(i32),
    /// Stopped by us through [`ChildHandle::terminate`].
    Terminated,
}

impl ChildExit {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ChildExit::Success,
            Some(c) => ChildExit::Failed(c),
            None => ChildExit::Failed(-1),
        }
    }
}

/// Lifecycle of one spawned child.
pub trait ChildHandle: Send {
    fn id(&self) -> Option<u32>;

    /// Non-blocking check whether the child has exited.
    fn try_exit(&mut self) -> Option<ChildExit>;

    /// Wait at most `limit` for the child to exit on its own. Returns `None`
    /// on timeout. On exit, all forwarded output has been presented.
    fn wait_for(&mut self, limit: Duration) -> BoxFuture<'_, Option<ChildExit>>;

    /// Graceful stop, escalating to a hard kill after a grace period.
    /// Idempotent; returns only once the process is gone and its output is
    /// drained.
    fn terminate(&mut self) -> BoxFuture<'_, ChildExit>;
}

/// A running child plus its established side channel.
pub struct ChildSession {
    pub connection: Connection,
    pub child: Box<dyn ChildHandle>,
}

impl std::fmt::Debug for ChildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSession")
            .field("connection", &self.connection)
            .field("pid", &self.child.id())
            .finish()
    }
}

/// Starts a child for a source file and hands back a connected session.
pub trait Launcher: Send + Sync {
    fn launch<'a>(&'a self, source: &'a Path) -> BoxFuture<'a, Result<ChildSession, RunFailure>>;
}
