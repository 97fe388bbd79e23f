// src/config/mod.rs

//! Configuration loading and validation for solwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate globs, regexes and numeric limits (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    CasesSection, ChannelSection, ConfigFile, RawConfigFile, RunnerConfig, TimeoutSection,
    WatchSection,
};
pub use validate::validate_config;
