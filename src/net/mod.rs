//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → gate.rs (wait for a handler slot)
//!     → listener.rs (accept from the backlog)
//!     → connection.rs (id + live-connection tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The slot is taken before `accept`, so the accept loop itself blocks
//!   when the service is saturated
//! - Each connection tracked for graceful shutdown

pub mod connection;
pub mod gate;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use gate::{ConnectionGate, ConnectionPermit};
pub use listener::{Listener, ListenerError};
