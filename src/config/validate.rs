// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SolwatchError};

/// Smallest frame limit we accept; children may legitimately send 64 KiB
/// messages.
pub const MIN_FRAME_BYTES: usize = 64 * 1024;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SolwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every semantic check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runners(cfg)?;
    validate_watch(cfg)?;
    validate_channel(cfg)?;
    validate_timeouts(cfg)?;
    validate_cases(cfg)?;
    Ok(())
}

fn validate_runners(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.is_empty() {
        return Err(SolwatchError::ConfigError(
            "config must contain at least one [runner.<name>] section".to_string(),
        ));
    }

    for (name, runner) in cfg.runner.iter() {
        if runner.cmd.is_empty() || runner.cmd[0].trim().is_empty() {
            return Err(SolwatchError::ConfigError(format!(
                "runner '{}' has an empty `cmd`",
                name
            )));
        }
        if runner.patterns.is_empty() {
            return Err(SolwatchError::ConfigError(format!(
                "runner '{}' has no `patterns`",
                name
            )));
        }
        for pat in runner.patterns.iter() {
            check_glob(pat, &format!("runner '{}'", name))?;
        }
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    for pat in cfg.watch.exclude.iter() {
        check_glob(pat, "[watch].exclude")?;
    }
    Ok(())
}

fn validate_channel(cfg: &RawConfigFile) -> Result<()> {
    if cfg.channel.port_attempts == 0 {
        return Err(SolwatchError::ConfigError(
            "[channel].port_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.channel.max_frame_bytes < MIN_FRAME_BYTES {
        return Err(SolwatchError::ConfigError(format!(
            "[channel].max_frame_bytes must be >= {} (got {})",
            MIN_FRAME_BYTES, cfg.channel.max_frame_bytes
        )));
    }
    Ok(())
}

fn validate_timeouts(cfg: &RawConfigFile) -> Result<()> {
    let t = &cfg.timeouts;
    for (name, value) in [
        ("connect_ms", t.connect_ms),
        ("poll_ms", t.poll_ms),
        ("terminate_grace_ms", t.terminate_grace_ms),
        ("exit_ms", t.exit_ms),
    ] {
        if value == 0 {
            return Err(SolwatchError::ConfigError(format!(
                "[timeouts].{} must be > 0",
                name
            )));
        }
    }
    Ok(())
}

fn validate_cases(cfg: &RawConfigFile) -> Result<()> {
    let re = Regex::new(&cfg.cases.path_pattern).map_err(|e| {
        SolwatchError::ConfigError(format!("[cases].path_pattern is not a valid regex: {e}"))
    })?;

    let names: Vec<&str> = re.capture_names().flatten().collect();
    for required in ["group", "item"] {
        if !names.contains(&required) {
            return Err(SolwatchError::ConfigError(format!(
                "[cases].path_pattern must define a named group `{}`",
                required
            )));
        }
    }
    Ok(())
}

fn check_glob(pattern: &str, owner: &str) -> Result<()> {
    Glob::new(pattern).map(|_| ()).map_err(|e| {
        SolwatchError::ConfigError(format!("{owner} has an invalid glob '{pattern}': {e}"))
    })
}
