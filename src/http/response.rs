//! Response encoding and the per-connection response writer.
//!
//! # Responsibilities
//! - Encode status lines and header lines byte-exactly
//! - Synthesize the fixed error and message responses
//! - Stream bodies onto the socket without buffering them whole
//! - Guarantee at most one response head per connection
//!
//! # Wire Formats
//! ```text
//! error:   HTTP/1.1 <code> <reason>\r\n\r\n<reason>\r\n
//! message: HTTP/1.1 200 OK\r\n\r\n<message>\r\n
//! head:    <version> <code> <reason>\r\n(<name>: <value>\r\n)*\r\n
//! ```

use std::time::Duration;

use hyper::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::TimeoutConfig;
use crate::http::error::{HttpError, HttpResult};
use crate::http::headers::Headers;
use crate::resilience::timeouts::with_deadline;

/// Reason phrase for a status, falling back to a generic phrase.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// `HTTP/1.1 <code> <reason>\r\n\r\n<reason>\r\n`
pub fn error_bytes(status: StatusCode) -> Vec<u8> {
    let reason = reason_phrase(status);
    format!("HTTP/1.1 {} {}\r\n\r\n{}\r\n", status.as_u16(), reason, reason).into_bytes()
}

/// `HTTP/1.1 200 OK\r\n\r\n<message>\r\n`
pub fn message_bytes(message: &str) -> Vec<u8> {
    format!("HTTP/1.1 200 OK\r\n\r\n{}\r\n", message).into_bytes()
}

/// Status line plus header lines of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: String,
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    /// An `HTTP/1.1` head with the canonical reason phrase and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status,
            reason: reason_phrase(status).to_string(),
            headers: Headers::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Serialize the head, blank-line terminator included.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("{} {} {}\r\n", self.version, self.status.as_u16(), self.reason);
        for (name, value) in self.headers.iter() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// Write side of one connection.
///
/// The first head written commits the connection; afterwards only body
/// bytes may follow, and error paths must not emit a second status line.
pub struct ResponseWriter<W> {
    inner: W,
    status: Option<StatusCode>,
    timeouts: TimeoutConfig,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inner: W, timeouts: TimeoutConfig) -> Self {
        Self {
            inner,
            status: None,
            timeouts,
        }
    }

    /// Status of the response already sent, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// Send a status line and headers; the body follows separately.
    pub async fn send_head(&mut self, head: &ResponseHead) -> HttpResult<()> {
        self.commit(head.status, head.encode()).await
    }

    /// Send a complete error response.
    pub async fn send_error(&mut self, status: StatusCode) -> HttpResult<()> {
        self.commit(status, error_bytes(status)).await
    }

    /// Send a complete `200 OK` response carrying `message`.
    pub async fn send_message(&mut self, message: &str) -> HttpResult<()> {
        self.commit(StatusCode::OK, message_bytes(message)).await
    }

    /// Write body bytes after the head.
    pub async fn send_body(&mut self, chunk: &[u8]) -> HttpResult<()> {
        debug_assert!(self.is_committed());
        self.inner.write_all(chunk).await?;
        Ok(())
    }

    /// Stream `body` to the peer under `deadline`; returns the bytes copied.
    pub async fn copy_body<R>(&mut self, body: &mut R, deadline: Duration) -> HttpResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        debug_assert!(self.is_committed());
        let inner = &mut self.inner;
        with_deadline("stream response body", deadline, async move {
            let copied = tokio::io::copy(body, inner).await?;
            inner.flush().await?;
            Ok(copied)
        })
        .await
    }

    /// Flush and half-close the write side.
    pub async fn shutdown(&mut self) -> HttpResult<()> {
        with_deadline("close connection", self.timeouts.write(), async {
            self.inner.shutdown().await?;
            Ok(())
        })
        .await
    }

    async fn commit(&mut self, status: StatusCode, bytes: Vec<u8>) -> HttpResult<()> {
        if let Some(sent) = self.status {
            return Err(HttpError::IoFailure(std::io::Error::other(format!(
                "response {} already sent",
                sent.as_u16()
            ))));
        }
        self.status = Some(status);

        let inner = &mut self.inner;
        with_deadline("write response head", self.timeouts.write(), async move {
            inner.write_all(&bytes).await?;
            inner.flush().await?;
            Ok(())
        })
        .await
    }
}
