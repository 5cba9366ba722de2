//! Parsed request state for one connection.
//!
//! # Responsibilities
//! - Hold the parsed request line
//! - Read the header section lazily, once, under the read deadline
//! - Expose the remaining byte stream as the request body

use std::str::FromStr;
use std::time::Duration;

use hyper::Method;
use tokio::io::AsyncBufRead;

use crate::config::TimeoutConfig;
use crate::http::error::{HttpError, HttpResult};
use crate::http::headers::Headers;
use crate::http::parser::HeadParser;
use crate::resilience::timeouts::with_deadline;

/// `METHOD SP TARGET SP VERSION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: String,
}

impl FromStr for RequestLine {
    type Err = HttpError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || HttpError::MalformedRequestLine(line.to_string());

        let mut tokens = line.split_ascii_whitespace();
        let (Some(method), Some(target), Some(version), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(malformed());
        };
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| malformed())?;

        Ok(Self {
            method,
            target: target.to_string(),
            version: version.to_string(),
        })
    }
}

/// A request whose line has been read; headers and body are still on the wire.
pub struct Request<'c, R> {
    line: RequestLine,
    parser: HeadParser,
    headers: Option<Headers>,
    reader: &'c mut R,
    timeouts: TimeoutConfig,
}

impl<'c, R> Request<'c, R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub(crate) fn new(line: RequestLine, parser: HeadParser, reader: &'c mut R, timeouts: TimeoutConfig) -> Self {
        Self {
            line,
            parser,
            headers: None,
            reader,
            timeouts,
        }
    }

    pub fn method(&self) -> &Method {
        &self.line.method
    }

    pub fn target(&self) -> &str {
        &self.line.target
    }

    pub fn version(&self) -> &str {
        &self.line.version
    }

    pub fn line(&self) -> &RequestLine {
        &self.line
    }

    /// The header section, read from the stream on first use.
    pub async fn headers(&mut self) -> HttpResult<&Headers> {
        if self.headers.is_none() {
            let read = with_deadline(
                "read headers",
                self.timeouts.read(),
                self.parser.headers(&mut *self.reader),
            )
            .await?;
            self.headers = Some(read);
        }
        Ok(self.headers.get_or_insert_with(Headers::new))
    }

    /// The stream positioned after whatever has been parsed so far.
    pub fn body(&mut self) -> &mut R {
        self.reader
    }

    /// Deadline for moving a whole body in either direction.
    pub fn transfer_timeout(&self) -> Duration {
        self.timeouts.transfer()
    }
}
