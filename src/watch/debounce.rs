// src/watch/debounce.rs

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Drops repeated notifications for the same path within `threshold`.
///
/// Only the most recently accepted `(path, instant)` is remembered, so an
/// event for a different path is always accepted.
#[derive(Debug, Clone)]
pub struct Debouncer {
    threshold: Duration,
    last: Option<(PathBuf, Instant)>,
}

impl Debouncer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Returns `true` and records the event when it should be acted upon.
    pub fn should_act(&mut self, path: &Path, now: Instant) -> bool {
        if let Some((last_path, at)) = &self.last {
            if last_path == path && now.saturating_duration_since(*at) < self.threshold {
                return false;
            }
        }
        self.last = Some((path.to_path_buf(), now));
        true
    }
}
