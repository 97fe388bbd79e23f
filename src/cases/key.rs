// src/cases/key.rs

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::errors::{Result, SolwatchError};

/// `(group, item)` extracted from a source path, e.g. `("2015", "day01")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseKey {
    pub group: String,
    pub item: String,
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.item)
    }
}

/// Compiled `[cases].path_pattern`.
#[derive(Debug, Clone)]
pub struct CaseKeyPattern {
    re: Regex,
}

impl CaseKeyPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| {
            SolwatchError::ConfigError(format!("invalid case path pattern {pattern:?}: {e}"))
        })?;
        Ok(Self { re })
    }

    /// Match against the path written with forward slashes. The last match
    /// wins, so a year inside the watch root path itself does not shadow the
    /// one next to the file.
    pub fn key_of(&self, source: &Path) -> Option<CaseKey> {
        let text = source.to_string_lossy().replace('\\', "/");
        let caps = self.re.captures_iter(&text).last()?;
        Some(CaseKey {
            group: caps.name("group")?.as_str().to_string(),
            item: caps.name("item")?.as_str().to_string(),
        })
    }
}
