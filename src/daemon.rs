//! Daemon shell around the engine
//!
//! The engine is synchronous and single-owner; this shell gives it a
//! heartbeat. Each quantum it drains inbound messages as they arrive,
//! ticks the engine, hands at most one outbound message to the transport,
//! pushes any destination-loss events, and publishes a fresh status
//! snapshot for the read-only API. Shutdown is cooperative: the flag is
//! checked at quantum granularity and in-flight processing completes.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::{OlsrEngine, StatusSnapshot};
use crate::transport::{Transport, TransportError};

/// Control handle for a running [`Daemon`].
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    shutdown: watch::Sender<bool>,
    status: watch::Receiver<StatusSnapshot>,
}

impl DaemonHandle {
    /// Asks the daemon to stop after its current quantum.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// A live feed of engine status snapshots, refreshed every quantum.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }
}

/// Owns the engine and a transport and runs the protocol loop.
pub struct Daemon<T: Transport> {
    engine: OlsrEngine,
    transport: T,
    quantum: Duration,
    shutdown: watch::Receiver<bool>,
    status: watch::Sender<StatusSnapshot>,
}

impl<T: Transport> Daemon<T> {
    /// Wires an engine to a transport. The returned handle outlives the
    /// daemon and serves shutdown and status observation.
    #[must_use]
    pub fn new(engine: OlsrEngine, transport: T) -> (Self, DaemonHandle) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(engine.status());
        let quantum = engine.config.quantum.as_duration();
        let daemon = Self {
            engine,
            transport,
            quantum,
            shutdown: shutdown_rx,
            status: status_tx,
        };
        let handle = DaemonHandle {
            shutdown: shutdown_tx,
            status: status_rx,
        };
        (daemon, handle)
    }

    /// Runs until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the transport's outbound
    /// side is gone; the engine state is dropped with the daemon.
    pub async fn run(mut self) -> Result<(), TransportError> {
        info!(node = %self.engine.node_id(), quantum = ?self.quantum, "daemon running");
        let mut inbound_open = true;

        'run: loop {
            // Ingest until the quantum elapses; ingress stays event-driven.
            let deadline = tokio::time::sleep(self.quantum);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    () = &mut deadline => break,
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || *self.shutdown.borrow() {
                            break 'run;
                        }
                    }
                    message = self.transport.recv(), if inbound_open => {
                        match message {
                            Some(message) => self.engine.receive(message),
                            None => {
                                debug!("inbound side of transport closed");
                                inbound_open = false;
                            }
                        }
                    }
                }
            }

            self.engine.tick();

            if let Some(message) = self.engine.drain_outbound() {
                if let Err(error) = self.transport.send(message).await {
                    warn!(%error, "transport rejected outbound message, stopping");
                    return Err(error);
                }
            }
            for event in self.engine.take_link_failures() {
                if self.transport.notify_link_failure(event).await.is_err() {
                    debug!("event side of transport closed");
                }
            }

            let _ = self.status.send(self.engine.status());
        }

        info!("daemon stopped");
        Ok(())
    }
}
