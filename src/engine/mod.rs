// src/engine/mod.rs

//! Watch-mode engine.
//!
//! This module ties together:
//! - the [`controller`], which owns the single active run and applies the
//!   debounce / exclude / content filters before starting a new one
//! - the [`runtime`] event loop that reacts to:
//!   - file-change notifications from the watcher
//!   - shutdown signals
//! - OS signal helpers in [`signals`]

use std::path::PathBuf;

/// Events flowing into the runtime from the watcher and signal handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A path under the watch root was created or modified.
    FileChanged { path: PathBuf },
    /// Graceful shutdown requested (Ctrl-C, SIGTERM).
    ShutdownRequested,
}

pub mod controller;
pub mod runtime;
pub mod signals;

pub use controller::{ActiveRun, WatchController};
pub use runtime::Runtime;
