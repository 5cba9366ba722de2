//! Outbound half of the proxy.
//!
//! # Responsibilities
//! - Turn the inbound request line and headers into an upstream request
//! - Issue it through a shared hyper client under the upstream deadline
//!
//! # Design Decisions
//! - Only absolute `http://` targets are forwarded; anything else is an
//!   upstream failure, since there is no origin to dial
//! - Headers are copied verbatim, duplicates included; no allow-list
//!   beyond dropping the body framing headers
//! - The outbound request never carries a body

use bytes::Bytes;
use http_body_util::Empty;
use hyper::body::Incoming;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use hyper::{Method, Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;
use crate::http::error::{HttpError, HttpResult};
use crate::http::headers::Headers;
use crate::resilience::timeouts::with_deadline;

/// Shared upstream client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Empty<Bytes>>,
    timeouts: TimeoutConfig,
}

impl Forwarder {
    pub fn new(timeouts: TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeouts }
    }

    /// Build the outbound request for `target`.
    pub fn build_request(&self, method: &Method, target: &str, headers: &Headers) -> HttpResult<Request<Empty<Bytes>>> {
        let uri = parse_target(target)?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        for (name, value) in headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpError::MalformedHeader(format!("{name}: {value}")))?;
            // The outbound request has no body; framing comes from that, not the client.
            if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
                continue;
            }
            let value =
                HeaderValue::from_str(value).map_err(|_| HttpError::MalformedHeader(format!("{name}: {value}")))?;
            builder = builder.header(name, value);
        }

        builder.body(Empty::new()).map_err(HttpError::upstream)
    }

    /// Send `request` upstream and wait for the response head.
    pub async fn send(&self, request: Request<Empty<Bytes>>) -> HttpResult<Response<Incoming>> {
        let uri = request.uri().clone();
        tracing::debug!(%uri, "Forwarding upstream");

        with_deadline("upstream request", self.timeouts.upstream(), async {
            self.client.request(request).await.map_err(|e| {
                tracing::warn!(%uri, error = %e, "Upstream request failed");
                HttpError::upstream(e)
            })
        })
        .await
    }
}

/// Parse an absolute `http://` target.
fn parse_target(target: &str) -> HttpResult<Uri> {
    let uri: Uri = target
        .parse()
        .map_err(|e| HttpError::upstream(format!("invalid target {target:?}: {e}")))?;

    match (uri.scheme_str(), uri.host()) {
        (Some("http"), Some(_)) => Ok(uri),
        (Some(scheme), Some(_)) => Err(HttpError::upstream(format!("unsupported scheme {scheme:?}"))),
        _ => Err(HttpError::upstream(format!("target {target:?} is not an absolute URL"))),
    }
}
