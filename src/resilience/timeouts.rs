//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap socket reads, writes and upstream calls with a deadline
//! - Report expiry as a distinct `Timeout` error naming the operation
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped on expiry
//! - Timed-out exchanges answer 500, or just close if the head is already out

use std::future::Future;
use std::time::Duration;

use crate::http::error::{HttpError, HttpResult};

/// Run `fut` under a deadline of `after`.
pub async fn with_deadline<F, T>(op: &'static str, after: Duration, fut: F) -> HttpResult<T>
where
    F: Future<Output = HttpResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(op, ?after, "Deadline expired");
            Err(HttpError::Timeout { op, after })
        }
    }
}
