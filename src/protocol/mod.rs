// src/protocol/mod.rs

//! Side-channel wire protocol.
//!
//! Transport is line-delimited JSON over a persistent local TCP connection:
//! one UTF-8 JSON object per `\n`-terminated line, in both directions.
//!
//! - orchestrator → child: `{"args": {..}, "input": "..", "part": null}` per
//!   case, then `{"done": true}` after the last case.
//! - child → orchestrator: `{"status": ".."}`,
//!   `{"answer": .., "duration": 0.01, "aside"?: {..}}` and `{"done": true}`.

pub mod message;

use tokio_util::codec::LinesCodec;

pub use message::{Aside, Message, Outbound, ProtocolError, Request, decode_message};

/// Line codec used for inbound frames. Lines longer than `max_frame_bytes`
/// are a framing error and end the connection.
pub fn line_codec(max_frame_bytes: usize) -> LinesCodec {
    LinesCodec::new_with_max_length(max_frame_bytes)
}
