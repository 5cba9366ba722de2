//! Accept loop shared by both services.
//!
//! # Responsibilities
//! - Take connections off the listener (which enforces the gate)
//! - Spawn one task per connection, holding its permit until the task ends
//! - Record per-connection metrics and spans
//! - Stop accepting on shutdown and drain in-flight connections

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ServiceConfig;
use crate::http::handler::{serve_connection, Service};
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics::{connection_opened, record_request};
use crate::observability::tracing::connection_span;

/// Runs a [`Service`] on a listener.
pub struct HttpServer<S> {
    service: Arc<S>,
    config: Arc<ServiceConfig>,
    tracker: ConnectionTracker,
}

impl<S: Service> HttpServer<S> {
    pub fn new(service: S, config: ServiceConfig) -> Self {
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Live connection tracker, for observing in-flight work.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept and serve connections until `shutdown` fires.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let name = self.service.name();
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(service = name, address = %addr, "HTTP server starting");

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = shutdown.recv() => {
                    tracing::info!(service = name, "Shutdown signal received");
                    break;
                }
            };

            let (stream, peer, permit) = match accepted {
                Ok(conn) => conn,
                Err(ListenerError::Accept(e)) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let guard = self.tracker.track();
            let span = connection_span(name, guard.id(), peer);
            let service = Arc::clone(&self.service);
            let config = Arc::clone(&self.config);

            tokio::spawn(
                async move {
                    // Released when this task ends, however it ends.
                    let _permit = permit;
                    let _guard = guard;

                    let started = Instant::now();
                    let active = connection_opened(name);
                    let status = serve_connection(&*service, stream, &config).await;
                    drop(active);

                    let status = status.map(|s| s.as_u16());
                    record_request(name, status, started);
                    tracing::debug!(
                        status,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Connection closed"
                    );
                }
                .instrument(span),
            );
        }

        drop(listener);
        self.drain().await;

        tracing::info!(service = name, "HTTP server stopped");
        Ok(())
    }

    async fn drain(&self) {
        let live = self.tracker.active_count();
        if live == 0 {
            return;
        }

        let deadline = self.config.timeouts.drain();
        tracing::info!(live, ?deadline, "Draining in-flight connections");
        if tokio::time::timeout(deadline, self.tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain deadline passed, abandoning connections"
            );
        }
    }
}
