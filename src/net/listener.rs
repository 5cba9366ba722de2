//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce `max_clients` via the concurrency gate
//! - Graceful handling of accept errors

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ListenerConfig;
use crate::net::gate::{ConnectionGate, ConnectionPermit};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),
    /// The concurrency gate was closed.
    #[error("Connection gate closed")]
    GateClosed,
}

/// A TCP listener that optionally limits concurrent connections.
///
/// When a gate is configured and all slots are held, `accept` waits for a
/// slot before taking the next connection off the backlog.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Slot pool, absent when accepts are unbounded.
    gate: Option<ConnectionGate>,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;

        Ok(Self::new(listener, config.max_clients))
    }

    /// Wrap an already bound listener.
    pub fn new(inner: TcpListener, max_clients: Option<usize>) -> Self {
        let gate = max_clients.map(ConnectionGate::new);

        match inner.local_addr() {
            Ok(address) => tracing::info!(%address, ?max_clients, "Listener bound"),
            Err(e) => tracing::warn!(error = %e, "Listener bound to unknown address"),
        }

        Self { inner, gate }
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// The permit, if any, must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, Option<ConnectionPermit>), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = match &self.gate {
            Some(gate) => Some(gate.acquire().await.ok_or(ListenerError::GateClosed)?),
            None => None,
        };

        // Then accept the connection
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.gate.as_ref().map(ConnectionGate::available),
            "Connection accepted"
        );

        Ok((stream, addr, permit))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// The concurrency gate, when one is configured.
    pub fn gate(&self) -> Option<&ConnectionGate> {
        self.gate.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_holds_a_slot_per_connection() {
        let config = ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_clients: Some(1),
        };
        let listener = Listener::bind(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        let gate = listener.gate().unwrap();
        assert!(permit.is_some());
        assert_eq!(gate.in_use(), 1);

        drop(permit);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn unbounded_listener_has_no_gate() {
        let listener = Listener::new(TcpListener::bind("127.0.0.1:0").await.unwrap(), None);
        assert!(listener.gate().is_none());
    }

    #[tokio::test]
    async fn bad_address_fails_to_bind() {
        let config = ListenerConfig {
            bind_address: "not-an-address".to_string(),
            max_clients: None,
        };
        assert!(matches!(Listener::bind(&config).await, Err(ListenerError::Bind(_))));
    }
}
