//! File server: GET downloads and POST uploads for allow-listed types.
//!
//! # Data Flow
//! ```text
//! GET  target → store.resolve → store.open → 200 + Content-Type → file bytes
//! POST target → store.resolve → store.prepare_upload → headers → Content-Length
//!             → store.create → exactly N body bytes → 200 + message
//! ```

pub mod mime;
pub mod store;

use std::io;

use hyper::{Method, StatusCode};
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::error::{HttpError, HttpResult};
use crate::http::handler::Service;
use crate::http::request::Request;
use crate::http::response::{ResponseHead, ResponseWriter};
use crate::resilience::timeouts::with_deadline;

pub use mime::MimeTable;
pub use store::{Resource, ResourceStore};

/// Body of a successful upload response.
pub const UPLOAD_OK: &str = "File uploaded successfully";

/// Serves and stores files through a [`ResourceStore`].
#[derive(Debug, Clone)]
pub struct FileServer {
    store: ResourceStore,
}

impl FileServer {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }

    async fn get<R, W>(&self, request: &mut Request<'_, R>, response: &mut ResponseWriter<W>) -> HttpResult<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let resource = self.store.resolve(request.target())?;
        let mut file = self.store.open(&resource).await?;

        let head = ResponseHead::new(StatusCode::OK).header("Content-Type", resource.content_type.as_str());
        response.send_head(&head).await?;
        let sent = response.copy_body(&mut file, request.transfer_timeout()).await?;

        tracing::info!(path = %resource.relative.display(), bytes = sent, "Served file");
        Ok(())
    }

    async fn post<R, W>(&self, request: &mut Request<'_, R>, response: &mut ResponseWriter<W>) -> HttpResult<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let resource = self.store.resolve(request.target())?;
        self.store.prepare_upload(&resource).await?;

        let length = request.headers().await?.content_length()?;
        tracing::debug!(path = %resource.relative.display(), length, "Receiving upload");

        let mut file = self.store.create(&resource).await?;
        let deadline = request.transfer_timeout();
        let body = request.body();
        let copied = with_deadline("read request body", deadline, async {
            // Bytes past Content-Length stay on the wire.
            let mut limited = (&mut *body).take(length);
            let copied = tokio::io::copy(&mut limited, &mut file).await?;
            file.flush().await?;
            Ok(copied)
        })
        .await;
        drop(file);

        match copied {
            Ok(n) if n == length => {}
            Ok(n) => {
                self.store.discard(&resource).await;
                return Err(HttpError::IoFailure(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("request body ended after {n} of {length} bytes"),
                )));
            }
            Err(e) => {
                self.store.discard(&resource).await;
                return Err(e);
            }
        }

        tracing::info!(path = %resource.relative.display(), bytes = length, "File uploaded");
        response.send_message(UPLOAD_OK).await
    }
}

impl Service for FileServer {
    fn name(&self) -> &'static str {
        "file_server"
    }

    fn supports(&self, method: &Method) -> bool {
        matches!(*method, Method::GET | Method::POST)
    }

    async fn handle<R, W>(&self, request: &mut Request<'_, R>, response: &mut ResponseWriter<W>) -> HttpResult<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        match *request.method() {
            Method::GET => self.get(request, response).await,
            Method::POST => self.post(request, response).await,
            ref other => Err(HttpError::UnsupportedMethod(other.to_string())),
        }
    }
}
