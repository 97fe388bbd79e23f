// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the runner / exclude glob patterns ([`patterns`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Suppressing duplicate notifications ([`debounce`]) and, optionally,
//!   content-identical rewrites ([`hash`]).
//! - Turning a changed path into a [`crate::types::RunTarget`] ([`target`]).
//!
//! It does **not** start runs; the engine's controller does.

pub mod debounce;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod target;
pub mod watcher;

pub use debounce::Debouncer;
pub use hash::{compute_file_hash, ContentFilter};
pub use patterns::{collect_source_files, SourcePatterns};
pub use target::TargetResolver;
pub use watcher::{spawn_watcher, WatcherHandle};
