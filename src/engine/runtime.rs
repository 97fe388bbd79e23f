// src/engine/runtime.rs

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;

use super::controller::WatchController;
use super::EngineEvent;

/// Event loop of watch mode: feeds change notifications to the
/// [`WatchController`] until shutdown is requested or every sender is gone.
pub struct Runtime {
    controller: WatchController,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(controller: WatchController, event_rx: mpsc::Receiver<EngineEvent>) -> Self {
        Self {
            controller,
            event_rx,
        }
    }

    /// Main event loop. On exit any active child has been stopped.
    pub async fn run(mut self) -> Result<()> {
        info!("solwatch runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                EngineEvent::FileChanged { path } => {
                    self.controller.handle_change(&path, Instant::now()).await;
                }
                EngineEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            }
        }

        self.controller.shutdown().await;
        info!("runtime exiting");
        Ok(())
    }
}
