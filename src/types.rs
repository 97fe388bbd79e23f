// src/types.rs

//! Shared data types used across the watcher, the runner and the presenter.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured arguments passed to a child alongside a case body.
pub type CaseArgs = Map<String, Value>;

/// What a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// A single solution source file: examples first, then the main case.
    File(PathBuf),
    /// Every recognised source file below a directory, main cases only.
    Directory(PathBuf),
}

impl RunTarget {
    pub fn path(&self) -> &Path {
        match self {
            RunTarget::File(p) | RunTarget::Directory(p) => p,
        }
    }
}

impl fmt::Display for RunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunTarget::File(p) => write!(f, "{}", p.display()),
            RunTarget::Directory(p) => write!(f, "{}/", p.display()),
        }
    }
}

/// One input to feed a child program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,

    #[serde(default)]
    pub args: CaseArgs,

    /// Expected answers, one per part. `None` (JSON `null`) or a missing
    /// trailing entry means the answer is not known yet.
    #[serde(default)]
    pub answers: Vec<Option<Value>>,

    /// Example cases give early feedback and never count toward a score.
    #[serde(default)]
    pub example: bool,
}

impl TestCase {
    pub fn main(input: impl Into<String>, answers: Vec<Option<Value>>) -> Self {
        Self {
            input: input.into(),
            args: CaseArgs::new(),
            answers,
            example: false,
        }
    }

    pub fn example(input: impl Into<String>, answers: Vec<Option<Value>>) -> Self {
        Self {
            example: true,
            ..Self::main(input, answers)
        }
    }

    /// Expected answer for the zero-based part index, if known.
    pub fn expected(&self, part_index: usize) -> Option<&Value> {
        self.answers.get(part_index).and_then(|a| a.as_ref())
    }
}

/// Render an answer the way it is compared and displayed: strings are shown
/// without quotes, everything else in its JSON form.
pub fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Two answers are equal when their display forms are equal, so `15` matches
/// `"15"`.
pub fn answers_match(actual: &Value, expected: &Value) -> bool {
    answer_text(actual) == answer_text(expected)
}
