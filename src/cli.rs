// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `solwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "solwatch",
    version,
    about = "Re-run solution programs against their test cases whenever a source file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Source file or directory to run once.
    ///
    /// Without it, the most recently modified source in the current
    /// directory is used.
    #[arg(value_name = "PATH", conflicts_with = "watch")]
    pub path: Option<PathBuf>,

    /// Keep watching ROOT and re-run on every change.
    #[arg(
        long,
        value_name = "ROOT",
        num_args = 0..=1,
        default_missing_value = "."
    )]
    pub watch: Option<PathBuf>,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SOLWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Only run this part (1-based).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub part: Option<u32>,

    /// Parse + validate, print the resolved config and target, but don't
    /// start anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Once(Option<PathBuf>),
    Watch(PathBuf),
}

impl CliArgs {
    pub fn mode(&self) -> Mode {
        match &self.watch {
            Some(root) => Mode::Watch(root.clone()),
            None => Mode::Once(self.path.clone()),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
