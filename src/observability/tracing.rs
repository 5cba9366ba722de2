//! Per-connection spans.
//!
//! Every log event emitted while a connection is being served carries the
//! service name, the connection id and the peer address.

use std::net::SocketAddr;

use tracing::Span;

use crate::net::ConnectionId;

pub fn connection_span(service: &'static str, id: ConnectionId, peer: SocketAddr) -> Span {
    tracing::info_span!("conn", service, id = %id, peer = %peer)
}
