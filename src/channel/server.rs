// src/channel/server.rs

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::connection::Connection;
use crate::config::ChannelSection;
use crate::errors::{Result, SolwatchError};

/// Accepted connections waiting to be claimed. Surplus ones are dropped so
/// the accept loop never blocks on a full queue.
const ACCEPT_QUEUE: usize = 8;

/// Rendezvous point children connect back to.
///
/// The bound address is exclusive to the whole watch session; every spawned
/// child gets a fresh [`Connection`] through [`ChannelServer::next_connection`].
#[derive(Debug)]
pub struct ChannelServer {
    addr: SocketAddr,
    connections: Mutex<mpsc::Receiver<Connection>>,
    shutdown: CancellationToken,
}

impl ChannelServer {
    /// Bind the first free candidate port and start accepting.
    ///
    /// Fails with [`SolwatchError::TransportStartup`] only when every
    /// candidate is taken.
    pub async fn start(cfg: &ChannelSection) -> Result<Self> {
        let listener = bind_first_free(cfg).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "channel server listening");

        let (tx, rx) = mpsc::channel::<Connection>(ACCEPT_QUEUE);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let max_frame_bytes = cfg.max_frame_bytes;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                debug!(%peer, "accepted side-channel connection");
                                let _ = stream.set_nodelay(true);
                                let conn = Connection::from_stream(stream, max_frame_bytes);
                                match tx.try_send(conn) {
                                    Ok(()) => {}
                                    Err(TrySendError::Full(conn)) => {
                                        warn!(peer = %conn.peer(), "too many unclaimed connections; dropping");
                                    }
                                    Err(TrySendError::Closed(_)) => break,
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "accept failed");
                            }
                        }
                    }
                }
            }
            debug!("channel accept loop finished; address released");
        });

        Ok(Self {
            addr,
            connections: Mutex::new(rx),
            shutdown,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Wait at most `wait` for the next accepted connection.
    pub async fn next_connection(&self, wait: Duration) -> Option<Connection> {
        let mut rx = self.connections.lock().await;
        match timeout(wait, rx.recv()).await {
            Ok(conn) => conn,
            Err(_) => None,
        }
    }

    /// Drop connections that were accepted but never claimed, e.g. from a
    /// child that was killed right after connecting.
    pub async fn discard_stale(&self) -> usize {
        let mut rx = self.connections.lock().await;
        let mut dropped = 0;
        while let Ok(conn) = rx.try_recv() {
            debug!(peer = %conn.peer(), "discarding stale connection");
            dropped += 1;
        }
        dropped
    }

    /// Stop accepting and release the bound address. Connections already
    /// handed out stay open.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for ChannelServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn bind_first_free(cfg: &ChannelSection) -> Result<TcpListener> {
    let candidates: Vec<u16> = if cfg.base_port == 0 {
        vec![0]
    } else {
        (0..cfg.port_attempts)
            .filter_map(|i| cfg.base_port.checked_add(i))
            .collect()
    };

    for port in candidates {
        match TcpListener::bind((cfg.host.as_str(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                debug!(host = %cfg.host, port, error = %err, "channel bind failed; trying next port");
            }
        }
    }

    Err(SolwatchError::TransportStartup {
        host: cfg.host.clone(),
        base_port: cfg.base_port,
        attempts: cfg.port_attempts,
    })
}
