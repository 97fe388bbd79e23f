// src/protocol/message.rs

//! Message shapes exchanged with a child over the side channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{CaseArgs, TestCase};

/// A message emitted by the child.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Transient human-readable progress ("compiling", "iteration 4M").
    Status { text: String },
    /// One part of the current case is finished.
    Result {
        answer: Value,
        duration: Duration,
        aside: Option<Aside>,
    },
    /// No more messages will arrive for the current case.
    Done,
}

/// Small diagnostic table a child may attach to a result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aside {
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// One case sent to the child.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub args: CaseArgs,
    pub input: String,
    pub part: Option<u32>,
}

impl Request {
    pub fn for_case(case: &TestCase, part: Option<u32>) -> Self {
        Self {
            args: case.args.clone(),
            input: case.input.clone(),
            part,
        }
    }
}

/// Frames the orchestrator writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Request(Request),
    /// End of target: the child may exit cleanly.
    Done,
}

impl Outbound {
    /// Encode as a single `\n`-terminated JSON line.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = match self {
            Outbound::Request(req) => serde_json::to_string(req)?,
            Outbound::Done => serde_json::to_string(&DoneFrame { done: true })?,
        };
        line.push('\n');
        Ok(line)
    }
}

#[derive(Serialize)]
struct DoneFrame {
    done: bool,
}

#[derive(Deserialize)]
struct ResultFrame {
    answer: Value,
    #[serde(default)]
    duration: Option<Value>,
    #[serde(default)]
    aside: Option<Aside>,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("unrecognised message with keys {0:?}")]
    UnknownShape(Vec<String>),

    #[error("framing error: {0}")]
    Frame(#[from] tokio_util::codec::LinesCodecError),
}

/// Decode one JSON line into a [`Message`].
///
/// The variant is picked from the object's key set:
/// - `answer` ⇒ `Result`
/// - `status` ⇒ `Status`
/// - `done: true` ⇒ `Done`
///
/// Anything else is rejected.
pub fn decode_message(line: &str) -> Result<Message, ProtocolError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(obj) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    if obj.contains_key("answer") {
        let frame: ResultFrame = serde_json::from_value(Value::Object(obj))?;
        // Missing or non-numeric durations read as zero.
        let secs = frame
            .duration
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0);
        return Ok(Message::Result {
            answer: frame.answer,
            duration: Duration::from_secs_f64(secs),
            aside: frame.aside,
        });
    }

    if let Some(Value::String(text)) = obj.get("status") {
        return Ok(Message::Status { text: text.clone() });
    }

    if obj.get("done") == Some(&Value::Bool(true)) {
        return Ok(Message::Done);
    }

    Err(ProtocolError::UnknownShape(keys_of(&obj)))
}

fn keys_of(obj: &Map<String, Value>) -> Vec<String> {
    obj.keys().cloned().collect()
}
