//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check the bind address and MIME table keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_clients must be at least 1")]
    ZeroMaxClients,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("files.mime_types key {0:?} must be lowercase and start with '.'")]
    MimeKey(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_clients == Some(0) {
        errors.push(ValidationError::ZeroMaxClients);
    }

    let t = &config.timeouts;
    for (name, value) in [
        ("timeouts.read_secs", t.read_secs),
        ("timeouts.write_secs", t.write_secs),
        ("timeouts.transfer_secs", t.transfer_secs),
        ("timeouts.upstream_secs", t.upstream_secs),
        ("timeouts.connect_secs", t.connect_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.limits.max_line_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_line_bytes"));
    }
    if config.limits.max_headers == 0 {
        errors.push(ValidationError::Zero("limits.max_headers"));
    }

    for ext in config.files.mime_types.keys() {
        let well_formed = ext.len() > 1 && ext.starts_with('.') && *ext == ext.to_ascii_lowercase();
        if !well_formed {
            errors.push(ValidationError::MimeKey(ext.clone()));
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
