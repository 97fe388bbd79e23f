// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from `Solwatch.toml`.
///
/// ```toml
/// [watch]
/// debounce_ms = 200
/// exclude = ["**/target/**"]
///
/// [channel]
/// host = "127.0.0.1"
/// base_port = 47100
///
/// [timeouts]
/// connect_ms = 1000
///
/// [cases]
/// dir = "cases"
///
/// [runner.python]
/// patterns = ["**/*.py"]
/// cmd = ["python3", "-u"]
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unchecked form; see [`ConfigFile`] for the validated one.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub channel: ChannelSection,

    #[serde(default)]
    pub timeouts: TimeoutSection,

    #[serde(default)]
    pub cases: CasesSection,

    /// Runner commands keyed by a free-form name (`[runner.<name>]`).
    ///
    /// When the table is absent the built-in python runner is used.
    #[serde(default = "default_runners")]
    pub runner: BTreeMap<String, RunnerConfig>,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            watch: WatchSection::default(),
            channel: ChannelSection::default(),
            timeouts: TimeoutSection::default(),
            cases: CasesSection::default(),
            runner: default_runners(),
        }
    }
}

/// Validated configuration. Only constructible through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub channel: ChannelSection,
    pub timeouts: TimeoutSection,
    pub cases: CasesSection,
    runner: BTreeMap<String, RunnerConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            watch: raw.watch,
            channel: raw.channel,
            timeouts: raw.timeouts,
            cases: raw.cases,
            runner: raw.runner,
        }
    }

    pub fn runners(&self) -> &BTreeMap<String, RunnerConfig> {
        &self.runner
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Events for the same path closer together than this are dropped.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Only act on an event when the file's content hash actually changed.
    #[serde(default)]
    pub use_hash: bool,

    /// Paths (relative to the watch root) that never trigger a run.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl WatchSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            use_hash: false,
            exclude: default_exclude(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/target/**".to_string(),
        "**/.git/**".to_string(),
        "**/__pycache__/**".to_string(),
    ]
}

/// `[channel]` section: where the side-channel listener binds.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSection {
    #[serde(default = "default_host")]
    pub host: String,

    /// First candidate port. `0` asks the OS for an ephemeral port.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// How many consecutive ports to try before giving up.
    #[serde(default = "default_port_attempts")]
    pub port_attempts: u16,

    /// Longest accepted protocol line, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_port: default_base_port(),
            port_attempts: default_port_attempts(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_port() -> u16 {
    47100
}

fn default_port_attempts() -> u16 {
    16
}

fn default_max_frame_bytes() -> usize {
    1024 * 1024
}

/// `[timeouts]` section. Every wait in the runner is bounded by one of these.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSection {
    /// How long a freshly spawned child has to connect back.
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,

    /// Upper bound for a single wait on the inbound message queue.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,

    /// Grace period between SIGTERM and a hard kill.
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,

    /// How long to wait for a clean exit after the final `done`.
    #[serde(default = "default_exit_ms")]
    pub exit_ms: u64,
}

impl TimeoutSection {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    pub fn exit(&self) -> Duration {
        Duration::from_millis(self.exit_ms)
    }
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            poll_ms: default_poll_ms(),
            terminate_grace_ms: default_terminate_grace_ms(),
            exit_ms: default_exit_ms(),
        }
    }
}

fn default_connect_ms() -> u64 {
    1000
}

fn default_poll_ms() -> u64 {
    200
}

fn default_terminate_grace_ms() -> u64 {
    1000
}

fn default_exit_ms() -> u64 {
    5000
}

/// `[cases]` section: where test inputs live and how a source path maps to
/// its (group, item) key.
#[derive(Debug, Clone, Deserialize)]
pub struct CasesSection {
    #[serde(default = "default_cases_dir")]
    pub dir: PathBuf,

    /// Regex with named captures `group` and `item`, matched against the
    /// source path with forward slashes.
    #[serde(default = "default_path_pattern")]
    pub path_pattern: String,
}

impl Default for CasesSection {
    fn default() -> Self {
        Self {
            dir: default_cases_dir(),
            path_pattern: default_path_pattern(),
        }
    }
}

fn default_cases_dir() -> PathBuf {
    PathBuf::from("cases")
}

fn default_path_pattern() -> String {
    r"(?P<group>\d{4})/(?P<item>[^/]+?)\.[^./]+$".to_string()
}

/// `[runner.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Globs (relative to the watch root) of source files this runner handles.
    pub patterns: Vec<String>,

    /// Program and leading arguments. The source path and the channel
    /// address are appended.
    pub cmd: Vec<String>,
}

fn default_runners() -> BTreeMap<String, RunnerConfig> {
    let mut runners = BTreeMap::new();
    runners.insert(
        "python".to_string(),
        RunnerConfig {
            patterns: vec!["**/*.py".to_string()],
            cmd: vec!["python3".to_string(), "-u".to_string()],
        },
    );
    runners
}
