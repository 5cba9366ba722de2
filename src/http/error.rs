//! Error taxonomy for a single HTTP exchange.
//!
//! Every failure that can happen while serving one connection is an
//! `HttpError`. The connection handler turns it into exactly one status code
//! via [`HttpError::status`]; the error text itself only goes to the log.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

/// Errors raised while reading, dispatching or answering a request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request line did not split into exactly three tokens.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A header line without a colon, or with an empty name.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The peer closed the stream in the middle of a line.
    #[error("stream ended before the request head was complete")]
    UnexpectedEof,

    /// A single line grew past the configured bound.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// The header section has more lines than allowed.
    #[error("more than {limit} header lines")]
    TooManyHeaders { limit: usize },

    #[error("method {0} is not supported by this service")]
    UnsupportedMethod(String),

    /// The target's extension is not in the MIME allow-list.
    #[error("extension of {0:?} is not in the allow-list")]
    UnsupportedExtension(String),

    /// The target resolves outside the served root.
    #[error("path {0:?} escapes the served root")]
    PathTraversalRejected(String),

    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("missing or invalid Content-Length")]
    MissingOrInvalidContentLength,

    /// Building, sending or reading the upstream request failed.
    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    /// open/create/mkdir on the served tree failed.
    #[error("{op} {}: {source}", path.display())]
    FilesystemFailure {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to a stream failed.
    #[error("I/O failure: {0}")]
    IoFailure(#[from] io::Error),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
}

impl HttpError {
    /// The status code sent to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::MalformedRequestLine(_)
            | HttpError::MalformedHeader(_)
            | HttpError::UnexpectedEof
            | HttpError::LineTooLong { .. }
            | HttpError::TooManyHeaders { .. }
            | HttpError::UnsupportedExtension(_)
            | HttpError::PathTraversalRejected(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
            HttpError::MissingOrInvalidContentLength
            | HttpError::UpstreamFailure(_)
            | HttpError::FilesystemFailure { .. }
            | HttpError::IoFailure(_)
            | HttpError::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn filesystem(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        HttpError::FilesystemFailure {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn upstream(err: impl std::fmt::Display) -> Self {
        HttpError::UpstreamFailure(err.to_string())
    }
}

/// Result type for request handling.
pub type HttpResult<T> = Result<T, HttpError>;
