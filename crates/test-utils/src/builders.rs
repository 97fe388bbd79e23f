#![allow(dead_code)]

use serde_json::Value;
use solwatch::config::{ConfigFile, RawConfigFile, RunnerConfig};
use solwatch::errors::SolwatchError;
use solwatch::types::TestCase;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults (python runner, default timeouts).
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn without_runners(mut self) -> Self {
        self.config.runner.clear();
        self
    }

    pub fn with_runner(mut self, name: &str, patterns: &[&str], cmd: &[&str]) -> Self {
        self.config.runner.insert(
            name.to_string(),
            RunnerConfig {
                patterns: patterns.iter().map(|s| s.to_string()).collect(),
                cmd: cmd.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    /// `0` binds an ephemeral port, which keeps parallel tests apart.
    pub fn base_port(mut self, port: u16) -> Self {
        self.config.channel.base_port = port;
        self
    }

    pub fn port_attempts(mut self, attempts: u16) -> Self {
        self.config.channel.port_attempts = attempts;
        self
    }

    pub fn max_frame_bytes(mut self, bytes: usize) -> Self {
        self.config.channel.max_frame_bytes = bytes;
        self
    }

    pub fn connect_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.connect_ms = ms;
        self
    }

    pub fn poll_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.poll_ms = ms;
        self
    }

    pub fn terminate_grace_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.terminate_grace_ms = ms;
        self
    }

    pub fn exit_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.exit_ms = ms;
        self
    }

    pub fn path_pattern(mut self, pattern: &str) -> Self {
        self.config.cases.path_pattern = pattern.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile, SolwatchError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TestCase`.
pub struct TestCaseBuilder {
    case: TestCase,
}

impl TestCaseBuilder {
    pub fn main(input: &str) -> Self {
        Self {
            case: TestCase::main(input, vec![]),
        }
    }

    pub fn example(input: &str) -> Self {
        Self {
            case: TestCase::example(input, vec![]),
        }
    }

    pub fn answer(mut self, value: impl Into<Value>) -> Self {
        self.case.answers.push(Some(value.into()));
        self
    }

    pub fn unknown_answer(mut self) -> Self {
        self.case.answers.push(None);
        self
    }

    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.case.args.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> TestCase {
        self.case
    }
}
