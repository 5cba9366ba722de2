//! Forwarding proxy.
//!
//! # Data Flow
//! ```text
//! GET <absolute-url>
//!     → request headers (shared parser)
//!     → forwarder.rs (hyper client, upstream deadline)
//!     → relay.rs (status line, one line per header value, streamed body)
//! ```
//!
//! Any other method is answered 501 by the connection handler before it
//! reaches this service.

pub mod forwarder;
pub mod relay;

use hyper::Method;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::config::TimeoutConfig;
use crate::http::error::{HttpError, HttpResult};
use crate::http::handler::Service;
use crate::http::request::Request;
use crate::http::response::ResponseWriter;

pub use forwarder::Forwarder;

/// Relays GET requests for absolute URLs to their origin.
#[derive(Clone)]
pub struct ForwardProxy {
    forwarder: Forwarder,
}

impl ForwardProxy {
    pub fn new(timeouts: TimeoutConfig) -> Self {
        Self {
            forwarder: Forwarder::new(timeouts),
        }
    }
}

impl Service for ForwardProxy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn supports(&self, method: &Method) -> bool {
        method == Method::GET
    }

    async fn handle<R, W>(&self, request: &mut Request<'_, R>, response: &mut ResponseWriter<W>) -> HttpResult<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        if request.method() != Method::GET {
            return Err(HttpError::UnsupportedMethod(request.method().to_string()));
        }

        let method = request.method().clone();
        let target = request.target().to_string();
        let headers = request.headers().await?;
        let outbound = self.forwarder.build_request(&method, &target, headers)?;

        let upstream = self.forwarder.send(outbound).await?;
        let status = upstream.status();
        let relayed = relay::relay(upstream, response, request.transfer_timeout()).await?;

        tracing::info!(
            upstream = %target,
            status = status.as_u16(),
            bytes = relayed,
            "Relayed upstream response"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::http::handler::serve_connection;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn roundtrip(raw: &[u8]) -> Vec<u8> {
        let (client, conn) = tokio::io::duplex(16 * 1024);
        let task = tokio::spawn(async move {
            let config = ServiceConfig::default();
            let proxy = ForwardProxy::new(config.timeouts);
            serve_connection(&proxy, conn, &config).await
        });

        let (mut rd, mut wr) = tokio::io::split(client);
        wr.write_all(raw).await.unwrap();
        wr.shutdown().await.unwrap();

        let mut out = Vec::new();
        rd.read_to_end(&mut out).await.unwrap();
        task.await.unwrap();
        out
    }

    #[tokio::test]
    async fn post_is_not_implemented() {
        let out = roundtrip(b"POST http://127.0.0.1:9/ HTTP/1.1\r\n\r\n").await;
        assert_eq!(out, b"HTTP/1.1 501 Not Implemented\r\n\r\nNot Implemented\r\n".to_vec());
    }

    #[tokio::test]
    async fn malformed_request_line_is_400() {
        let out = roundtrip(b"GET http://example.com/\r\n\r\n").await;
        assert_eq!(out, b"HTTP/1.1 400 Bad Request\r\n\r\nBad Request\r\n".to_vec());
    }

    #[tokio::test]
    async fn relative_target_is_500() {
        let out = roundtrip(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").await;
        assert_eq!(
            out,
            b"HTTP/1.1 500 Internal Server Error\r\n\r\nInternal Server Error\r\n".to_vec()
        );
    }
}
