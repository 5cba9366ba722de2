//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): responses by service and status
//! - `http_request_duration_seconds` (histogram): connection latency
//! - `http_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Serve Prometheus metrics on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished exchange. `status` is `None` when nothing was sent.
pub fn record_request(service: &'static str, status: Option<u16>, started: Instant) {
    let status = status.map_or_else(|| "none".to_string(), |s| s.to_string());
    metrics::counter!("http_requests_total", "service" => service, "status" => status).increment(1);
    metrics::histogram!("http_request_duration_seconds", "service" => service)
        .record(started.elapsed().as_secs_f64());
}

/// Count a connection in `http_active_connections` until the guard drops.
pub fn connection_opened(service: &'static str) -> ActiveConnection {
    metrics::gauge!("http_active_connections", "service" => service).increment(1.0);
    ActiveConnection { service }
}

/// Keeps a connection counted in the active gauge; decrements on drop,
/// unwinding included.
#[derive(Debug)]
pub struct ActiveConnection {
    service: &'static str,
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        metrics::gauge!("http_active_connections", "service" => self.service).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn active(rendered: &str) -> Option<f64> {
        rendered
            .lines()
            .find(|line| line.starts_with("http_active_connections{service=\"gauge_test\"}"))
            .and_then(|line| line.split_whitespace().last())
            .and_then(|value| value.parse().ok())
    }

    #[test]
    fn gauge_released_when_handler_panics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let _held = connection_opened("gauge_test");
            assert_eq!(active(&handle.render()), Some(1.0));

            let result = std::panic::catch_unwind(|| {
                let _guard = connection_opened("gauge_test");
                panic!("handler failed");
            });
            assert!(result.is_err());
            assert_eq!(active(&handle.render()), Some(1.0));
        });
    }
}
