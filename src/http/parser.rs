//! Line-oriented request head parser.
//!
//! # Responsibilities
//! - Read the request line and split it into method, target and version
//! - Read header lines up to the blank-line terminator
//! - Bound every line and the number of header lines
//!
//! # States
//! ```text
//! AwaitingRequestLine ──request_line()──▶ AwaitingHeaders ──headers()──▶ Done
//! ```
//!
//! End-of-stream where a new header line would start ends the header
//! section. End-of-stream in the middle of any line is `UnexpectedEof`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::config::LimitsConfig;
use crate::http::error::{HttpError, HttpResult};
use crate::http::headers::Headers;
use crate::http::request::RequestLine;

/// Where the parser is in the request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    AwaitingHeaders,
    Done,
}

/// Incremental parser for one request head.
#[derive(Debug, Clone)]
pub struct HeadParser {
    state: ParseState,
    max_line_bytes: usize,
    max_headers: usize,
    line: Vec<u8>,
}

impl HeadParser {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            state: ParseState::AwaitingRequestLine,
            max_line_bytes: limits.max_line_bytes,
            max_headers: limits.max_headers,
            line: Vec::with_capacity(256),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Read and split the request line.
    pub async fn request_line<R>(&mut self, reader: &mut R) -> HttpResult<RequestLine>
    where
        R: AsyncBufRead + Unpin,
    {
        debug_assert_eq!(self.state, ParseState::AwaitingRequestLine);

        let line = match self.next_line(reader).await? {
            Some(line) => line,
            None => return Err(HttpError::UnexpectedEof),
        };
        let text = std::str::from_utf8(line)
            .map_err(|_| HttpError::MalformedRequestLine(String::from_utf8_lossy(line).into_owned()))?;
        let request_line = text.parse::<RequestLine>()?;

        self.state = ParseState::AwaitingHeaders;
        Ok(request_line)
    }

    /// Read header lines until the blank terminator or end-of-stream.
    pub async fn headers<R>(&mut self, reader: &mut R) -> HttpResult<Headers>
    where
        R: AsyncBufRead + Unpin,
    {
        debug_assert_eq!(self.state, ParseState::AwaitingHeaders);

        let max_headers = self.max_headers;
        let mut headers = Headers::new();
        loop {
            let line = match self.next_line(reader).await? {
                Some(line) => line,
                None => break,
            };
            let text = String::from_utf8_lossy(line);
            let text = text.trim();
            if text.is_empty() {
                break;
            }

            let (name, value) = text
                .split_once(':')
                .ok_or_else(|| HttpError::MalformedHeader(text.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(HttpError::MalformedHeader(text.to_string()));
            }
            if headers.len() == max_headers {
                return Err(HttpError::TooManyHeaders { limit: max_headers });
            }
            headers.append(name, value.trim());
        }

        self.state = ParseState::Done;
        Ok(headers)
    }

    /// Read one `\n`-terminated line, without the line ending.
    ///
    /// Returns `None` when the stream is already at its end.
    async fn next_line<R>(&mut self, reader: &mut R) -> HttpResult<Option<&[u8]>>
    where
        R: AsyncBufRead + Unpin,
    {
        self.line.clear();
        let mut limited = (&mut *reader).take(self.max_line_bytes as u64);
        let read = limited.read_until(b'\n', &mut self.line).await?;

        if read == 0 {
            return Ok(None);
        }
        if self.line.last() != Some(&b'\n') {
            if read == self.max_line_bytes {
                return Err(HttpError::LineTooLong { limit: self.max_line_bytes });
            }
            return Err(HttpError::UnexpectedEof);
        }

        let mut end = self.line.len() - 1;
        if end > 0 && self.line[end - 1] == b'\r' {
            end -= 1;
        }
        Ok(Some(&self.line[..end]))
    }
}
