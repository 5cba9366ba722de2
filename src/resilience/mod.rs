//! Resilience subsystem.
//!
//! # Design Decisions
//! - Nothing is retried: each request gets one attempt and one response
//! - Every blocking step runs under an explicit deadline (timeouts.rs)

pub mod timeouts;
