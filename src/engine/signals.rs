// src/engine/signals.rs

//! Completes when the process is asked to stop.
//!
//! On unix SIGINT, SIGTERM and SIGQUIT are handled, with
//! [`tokio::signal::ctrl_c`] as a fallback. Elsewhere only Ctrl-C.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::EngineEvent;

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Forward the first shutdown signal to the engine as
/// [`EngineEvent::ShutdownRequested`].
pub fn spawn_shutdown_forwarder(tx: mpsc::Sender<EngineEvent>) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            warn!(error = %e, "failed to listen for shutdown signals");
            return;
        }
        info!("shutdown signal received");
        let _ = tx.send(EngineEvent::ShutdownRequested).await;
    });
}
