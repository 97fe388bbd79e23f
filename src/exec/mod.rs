// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the [`Launcher`] / [`ChildHandle`] seam the
//!   orchestrator talks to, so tests can swap in scripted children.
//! - [`supervisor`] is the production launcher: spawns the runner command,
//!   waits for the child to connect and owns its lifecycle.
//! - [`command`] builds the child command line.
//! - [`passthrough`] forwards child stdout/stderr to the presenter.

pub mod backend;
pub mod command;
pub mod passthrough;
pub mod supervisor;

pub use backend::{BoxFuture, ChildExit, ChildHandle, ChildSession, Launcher};
pub use supervisor::{ProcessSupervisor, SupervisedChild};
