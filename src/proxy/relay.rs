//! Inbound half of the proxy: writing the upstream response to the client.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::ext::ReasonPhrase;
use hyper::header::TRANSFER_ENCODING;
use hyper::{Response, Version};
use tokio::io::AsyncWrite;

use crate::http::error::{HttpError, HttpResult};
use crate::http::response::{reason_phrase, ResponseHead, ResponseWriter};
use crate::resilience::timeouts::with_deadline;

/// Translate an upstream response head into our wire head.
///
/// Each header value becomes its own line. `Transfer-Encoding` is left out
/// because the body is relayed decoded and delimited by connection close.
pub fn relay_head<B>(response: &Response<B>) -> ResponseHead {
    let status = response.status();
    let reason = response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned())
        .unwrap_or_else(|| reason_phrase(status).to_string());

    let mut head = ResponseHead::new(status);
    head.version = version_text(response.version()).to_string();
    head.reason = reason;

    for (name, value) in response.headers() {
        if name == TRANSFER_ENCODING {
            continue;
        }
        let value = String::from_utf8_lossy(value.as_bytes());
        head.headers.append(title_case(name.as_str()), value);
    }
    head
}

/// Write head and body of `response`; returns the body bytes relayed.
pub async fn relay<B, W>(response: Response<B>, writer: &mut ResponseWriter<W>, deadline: Duration) -> HttpResult<u64>
where
    B: Body<Data = Bytes> + Unpin + Send,
    B::Error: std::fmt::Display,
    W: AsyncWrite + Unpin + Send,
{
    let head = relay_head(&response);
    writer.send_head(&head).await?;

    let mut body = response.into_body();
    with_deadline("relay response body", deadline, async {
        let mut relayed = 0u64;
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(HttpError::upstream)?;
            // Trailers have nowhere to go once the body is close-delimited.
            if let Ok(data) = frame.into_data() {
                writer.send_body(&data).await?;
                relayed += data.len() as u64;
            }
        }
        Ok(relayed)
    })
    .await
}

fn version_text(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// `set-cookie` → `Set-Cookie`
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}
