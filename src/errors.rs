// src/errors.rs

//! Crate-wide error types.
//!
//! - [`SolwatchError`] covers failures that end the whole session (bad
//!   config, no bindable channel address, ...).
//! - [`RunFailure`] is the per-run taxonomy. Nothing in it is fatal: the
//!   watch controller reports it and keeps watching.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("could not bind channel server on {host} (tried {attempts} port(s) from {base_port})")]
    TransportStartup {
        host: String,
        base_port: u16,
        attempts: u16,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a single run (or a single file within a directory run) did not
/// complete normally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    #[error("child never connected to the channel server within {0:?}")]
    TransportNeverEstablished(Duration),

    #[error("child exited with status {0}")]
    ChildExitedNonZero(i32),

    #[error("connection closed before the case finished")]
    Disconnected,

    #[error("run cancelled")]
    Cancelled,

    #[error("test input unavailable: {0}")]
    InputUnavailable(String),

    #[error("could not start child process: {0}")]
    SpawnFailed(String),
}

impl RunFailure {
    /// Cancellation is an expected outcome of a superseding edit and must not
    /// be presented as a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RunFailure::Cancelled)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SolwatchError>;
