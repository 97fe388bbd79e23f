// src/channel/connection.rs

//! One side-channel session with exactly one child.

use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::errors::RunFailure;
use crate::protocol::{line_codec, decode_message, Aside, Message, Outbound, Request};

const INBOUND_CAPACITY: usize = 1024;
const OUTBOUND_CAPACITY: usize = 16;

/// Result of a single bounded wait on the inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Recv {
    Message(Message),
    /// The child side is gone (EOF, framing error, or process death) and
    /// every queued message has been consumed.
    Closed,
    TimedOut,
}

/// Outbound send capability plus an ordered inbound queue of decoded
/// messages.
#[derive(Debug)]
pub struct Connection {
    peer: String,
    outbound: mpsc::Sender<Outbound>,
    inbound: mpsc::Receiver<Message>,
}

impl Connection {
    pub fn new(
        peer: impl Into<String>,
        outbound: mpsc::Sender<Outbound>,
        inbound: mpsc::Receiver<Message>,
    ) -> Self {
        Self {
            peer: peer.into(),
            outbound,
            inbound,
        }
    }

    /// Wrap an accepted socket: spawns one reader task decoding frames into
    /// the inbound queue and one writer task encoding outbound frames.
    ///
    /// A malformed or over-long frame closes the inbound queue.
    pub fn from_stream(stream: TcpStream, max_frame_bytes: usize) -> Self {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let (read_half, mut write_half) = stream.into_split();

        let (in_tx, in_rx) = mpsc::channel::<Message>(INBOUND_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);

        let reader_peer = peer.clone();
        tokio::spawn(async move {
            let mut frames = FramedRead::new(read_half, line_codec(max_frame_bytes));

            while let Some(frame) = frames.next().await {
                let line = match frame {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(peer = %reader_peer, error = %err, "framing error; closing connection");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match decode_message(&line) {
                    Ok(msg) => {
                        if in_tx.send(msg).await.is_err() {
                            debug!(peer = %reader_peer, "inbound queue dropped; stopping reader");
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(peer = %reader_peer, error = %err, "malformed message; closing connection");
                        break;
                    }
                }
            }
            debug!(peer = %reader_peer, "connection reader finished");
        });

        let writer_peer = peer.clone();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let line = match frame.to_line() {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(peer = %writer_peer, error = %err, "failed to encode outbound frame");
                        continue;
                    }
                };
                if let Err(err) = write_half.write_all(line.as_bytes()).await {
                    debug!(peer = %writer_peer, error = %err, "write failed; stopping writer");
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        Self::new(peer, out_tx, in_rx)
    }

    /// In-memory connection: the returned [`ChildEnd`] plays the child.
    pub fn pair() -> (Connection, ChildEnd) {
        let (in_tx, in_rx) = mpsc::channel::<Message>(INBOUND_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);
        let conn = Connection::new("in-memory", out_tx, in_rx);
        let end = ChildEnd {
            requests: out_rx,
            messages: in_tx,
        };
        (conn, end)
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub async fn send(&self, frame: Outbound) -> Result<(), RunFailure> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| RunFailure::Disconnected)
    }

    pub async fn send_request(&self, request: Request) -> Result<(), RunFailure> {
        self.send(Outbound::Request(request)).await
    }

    pub async fn send_done(&self) -> Result<(), RunFailure> {
        self.send(Outbound::Done).await
    }

    /// Wait at most `wait` for the next inbound message.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Recv {
        match timeout(wait, self.inbound.recv()).await {
            Ok(Some(msg)) => Recv::Message(msg),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::TimedOut,
        }
    }

    /// Drop whatever is queued without looking at it. Returns how many
    /// messages were discarded.
    pub fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.inbound.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// The child's half of an in-memory [`Connection`].
#[derive(Debug)]
pub struct ChildEnd {
    pub requests: mpsc::Receiver<Outbound>,
    pub messages: mpsc::Sender<Message>,
}

impl ChildEnd {
    pub async fn next_request(&mut self) -> Option<Outbound> {
        self.requests.recv().await
    }

    pub async fn status(&self, text: &str) -> bool {
        self.send(Message::Status {
            text: text.to_string(),
        })
        .await
    }

    pub async fn result(&self, answer: Value, secs: f64) -> bool {
        self.send(Message::Result {
            answer,
            duration: Duration::from_secs_f64(secs),
            aside: None,
        })
        .await
    }

    pub async fn result_with_aside(&self, answer: Value, secs: f64, aside: Aside) -> bool {
        self.send(Message::Result {
            answer,
            duration: Duration::from_secs_f64(secs),
            aside: Some(aside),
        })
        .await
    }

    pub async fn done(&self) -> bool {
        self.send(Message::Done).await
    }

    async fn send(&self, msg: Message) -> bool {
        self.messages.send(msg).await.is_ok()
    }
}
