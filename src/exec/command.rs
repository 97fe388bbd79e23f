// src/exec/command.rs

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::RunnerConfig;

/// Build the child command line: `<runner cmd...> <source> <address>`.
///
/// Stdout and stderr are piped for the passthrough, stdin is closed (cases
/// arrive over the side channel) and the child is killed if its handle is
/// dropped.
pub fn build_command(runner: &RunnerConfig, source: &Path, address: &str) -> Command {
    let (program, leading) = match runner.cmd.split_first() {
        Some((program, rest)) => (program.as_str(), rest),
        None => ("", &[][..]),
    };

    let mut cmd = Command::new(program);
    cmd.args(leading)
        .arg(source)
        .arg(address)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Human-readable rendering of the command, for logs.
pub fn describe(runner: &RunnerConfig, source: &Path, address: &str) -> String {
    let mut parts = runner.cmd.clone();
    parts.push(source.display().to_string());
    parts.push(address.to_string());
    parts.join(" ")
}
