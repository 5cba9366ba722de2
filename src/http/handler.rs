//! Per-connection request handling.
//!
//! # States
//! ```text
//! read request line ──fail──▶ code ┐
//!        │                         │
//!   method allowed? ──no──▶ 501 ───┤
//!        │                         │
//!   Service::handle ──err──▶ code ─┤
//!        │                         ▼
//!        └───────────────▶ shutdown write side, drain, close
//! ```
//!
//! Exactly one response leaves this module per connection. Failures after
//! the response head is on the wire are logged and end the connection.

use std::future::Future;

use hyper::{Method, StatusCode};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};

use crate::config::ServiceConfig;
use crate::http::error::{HttpError, HttpResult};
use crate::http::parser::HeadParser;
use crate::http::request::Request;
use crate::http::response::ResponseWriter;
use crate::resilience::timeouts::with_deadline;

/// One of the two services: what to do with a request once its line is read.
pub trait Service: Send + Sync + 'static {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Whether `method` is dispatched to [`Service::handle`]; others get 501.
    fn supports(&self, method: &Method) -> bool;

    /// Produce exactly one response for `request`.
    ///
    /// Returning an error before anything was written lets the connection
    /// handler send the matching error response.
    fn handle<R, W>(
        &self,
        request: &mut Request<'_, R>,
        response: &mut ResponseWriter<W>,
    ) -> impl Future<Output = HttpResult<()>> + Send
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send;
}

/// Serve one connection to completion and close it.
///
/// Returns the status that was sent, if a response got out at all.
pub async fn serve_connection<S, T>(service: &S, stream: T, config: &ServiceConfig) -> Option<StatusCode>
where
    S: Service,
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut writer = ResponseWriter::new(write_half, config.timeouts);

    if let Err(err) = exchange(service, &mut reader, &mut writer, config).await {
        respond_with_error(&mut writer, err).await;
    }

    close(&mut reader, &mut writer, config).await;
    writer.status()
}

async fn exchange<S, R, W>(
    service: &S,
    reader: &mut R,
    writer: &mut ResponseWriter<W>,
    config: &ServiceConfig,
) -> HttpResult<()>
where
    S: Service,
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut parser = HeadParser::new(&config.limits);
    let line = with_deadline("read request line", config.timeouts.read(), parser.request_line(reader)).await?;

    tracing::debug!(
        method = %line.method,
        request_target = %line.target,
        version = %line.version,
        "Request line parsed"
    );

    if !service.supports(&line.method) {
        return Err(HttpError::UnsupportedMethod(line.method.to_string()));
    }

    let mut request = Request::new(line, parser, reader, config.timeouts);
    service.handle(&mut request, writer).await
}

async fn respond_with_error<W>(writer: &mut ResponseWriter<W>, err: HttpError)
where
    W: AsyncWrite + Unpin + Send,
{
    let status = err.status();

    if writer.is_committed() {
        tracing::warn!(error = %err, "Request failed after the response head was sent");
        return;
    }

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "Request failed");
    } else {
        tracing::info!(status = status.as_u16(), error = %err, "Request rejected");
    }

    if let Err(e) = writer.send_error(status).await {
        tracing::debug!(error = %e, "Could not deliver error response");
    }
}

/// Half-close, then discard a bounded amount of unread request bytes so the
/// peer sees our response followed by FIN rather than a reset.
async fn close<R, W>(reader: &mut R, writer: &mut ResponseWriter<W>, config: &ServiceConfig)
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    if let Err(e) = writer.shutdown().await {
        tracing::debug!(error = %e, "Shutdown of write side failed");
        return;
    }

    let mut unread = (&mut *reader).take(config.limits.linger_bytes);
    let drained = tokio::time::timeout(
        config.timeouts.linger(),
        tokio::io::copy(&mut unread, &mut tokio::io::sink()),
    )
    .await;

    if let Ok(Ok(bytes)) = drained {
        if bytes > 0 {
            tracing::trace!(bytes, "Discarded unread request bytes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt};

    /// Answers GET with the target echoed back.
    struct Echo;

    impl Service for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn supports(&self, method: &Method) -> bool {
            method == Method::GET
        }

        async fn handle<R, W>(&self, request: &mut Request<'_, R>, response: &mut ResponseWriter<W>) -> HttpResult<()>
        where
            R: AsyncBufRead + Unpin + Send,
            W: AsyncWrite + Unpin + Send,
        {
            let target = request.target().to_string();
            response.send_message(&target).await
        }
    }

    async fn roundtrip(raw: &[u8]) -> (Option<StatusCode>, String) {
        let (client, server) = tokio::io::duplex(4096);
        let config = ServiceConfig::default();
        let task = tokio::spawn(async move { serve_connection(&Echo, server, &config).await });

        let (mut rd, mut wr) = tokio::io::split(client);
        wr.write_all(raw).await.unwrap();
        wr.shutdown().await.unwrap();

        let mut out = String::new();
        rd.read_to_string(&mut out).await.unwrap();
        (task.await.unwrap(), out)
    }

    #[tokio::test]
    async fn dispatches_supported_method() {
        let (status, out) = roundtrip(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert_eq!(status, Some(StatusCode::OK));
        assert_eq!(out, "HTTP/1.1 200 OK\r\n\r\n/hello\r\n");
    }

    #[tokio::test]
    async fn unsupported_method_is_501() {
        let (status, out) = roundtrip(b"DELETE /hello HTTP/1.1\r\n\r\n").await;
        assert_eq!(status, Some(StatusCode::NOT_IMPLEMENTED));
        assert_eq!(out, "HTTP/1.1 501 Not Implemented\r\n\r\nNot Implemented\r\n");
    }

    #[tokio::test]
    async fn malformed_request_line_is_400() {
        let (status, out) = roundtrip(b"GET /hello\r\n\r\n").await;
        assert_eq!(status, Some(StatusCode::BAD_REQUEST));
        assert_eq!(out, "HTTP/1.1 400 Bad Request\r\n\r\nBad Request\r\n");
    }

    #[tokio::test]
    async fn stalled_request_line_times_out_with_500() {
        let (client, server) = tokio::io::duplex(4096);
        let mut config = ServiceConfig::default();
        config.timeouts.read_secs = 1;
        let task = tokio::spawn(async move { serve_connection(&Echo, server, &config).await });

        let (mut rd, mut wr) = tokio::io::split(client);
        wr.write_all(b"GET /ind").await.unwrap();

        let mut out = String::new();
        rd.read_to_string(&mut out).await.unwrap();
        assert_eq!(task.await.unwrap(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(out, "HTTP/1.1 500 Internal Server Error\r\n\r\nInternal Server Error\r\n");
        drop(wr);
    }

    #[tokio::test]
    async fn empty_connection_gets_400() {
        let (status, _) = roundtrip(b"").await;
        assert_eq!(status, Some(StatusCode::BAD_REQUEST));
    }
}
