//! Startup orchestration.
//!
//! # Responsibilities
//! - Load, override and validate configuration
//! - Initialize logging and the optional metrics exporter
//! - Bind the listener last, so traffic only arrives once ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and reported from `main`
//! - Subsystems initialize in order, not concurrently

use thiserror::Error;

use crate::config::{validate_config, ConfigError, ServiceConfig};
use crate::net::{Listener, ListenerError};
use crate::observability::{logging::init_logging, metrics::init_metrics};

/// Errors that stop a service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to open file root: {0}")]
    FileRoot(#[source] std::io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Validate a config assembled from file plus command-line overrides.
pub fn finalize_config(config: ServiceConfig) -> Result<ServiceConfig, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Install the tracing subscriber and, if configured, the metrics exporter.
///
/// Must be called from within a Tokio runtime.
pub fn init_observability(config: &ServiceConfig) -> Result<(), StartupError> {
    init_logging(&config.observability)?;

    if let Some(addr) = &config.observability.metrics_address {
        let addr = addr
            .parse()
            .map_err(|_| StartupError::MetricsAddress(addr.clone()))?;
        init_metrics(addr)?;
    }
    Ok(())
}

/// Bind the service listener.
pub async fn bind(config: &ServiceConfig) -> Result<Listener, StartupError> {
    let listener = Listener::bind(&config.listener).await?;
    Ok(listener)
}
