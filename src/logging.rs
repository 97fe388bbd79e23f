// src/logging.rs

//! Logging setup for `solwatch`.
//!
//! The filter comes from `--log-level` when given. Otherwise `SOLWATCH_LOG`
//! is read as an `EnvFilter` directive list (`debug`,
//! `solwatch::runner=trace,notify=warn`, ...). An unset or unparsable value
//! falls back to `info`.
//!
//! Logs go to stderr; stdout belongs to the presenter.

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "SOLWATCH_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(cli_level, env_value.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    if let Some(err) = rejected {
        warn!(env = LOG_ENV, error = %err, "ignoring invalid log filter; using {DEFAULT_DIRECTIVE}");
    }
    Ok(())
}

/// Resolve the filter. The second value carries the parse error when the
/// environment directive had to be discarded.
pub fn build_filter(
    cli_level: Option<LogLevel>,
    env_value: Option<&str>,
) -> (EnvFilter, Option<String>) {
    if let Some(level) = cli_level {
        return (EnvFilter::new(level_directive(level)), None);
    }

    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => match EnvFilter::try_new(value) {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(err.to_string())),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVE), None),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
