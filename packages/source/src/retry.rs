//! HTTP retry helper for transient errors.
//!
//! Open-data requests go through [`send_with_retry`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so connection failures,
//! timeouts, rate limiting, and server errors are retried with exponential
//! backoff. Every other response, including 4xx, is handed back untouched
//! so the caller can inspect it (the app-token fallback needs the 403 body).
//!
//! ```ignore
//! let response = retry::send_with_retry(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retries after the first attempt.
///
/// With backoff of 1s, 2s, 4s the total wait before giving up is 7 seconds.
pub const MAX_RETRIES: u32 = 3;

/// Sends the request built by `build_request`, retrying transient failures
/// up to [`MAX_RETRIES`] times.
///
/// The closure is called once per attempt because builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`SourceError::Http`] for a non-transient transport error or
/// once retries are exhausted on a transport error, and
/// [`SourceError::Status`] once retries are exhausted on 429/5xx.
#[allow(clippy::future_not_send)]
pub async fn send_with_retry<F>(build_request: F) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < MAX_RETRIES {
                    log::warn!("  transient error: {e}");
                } else {
                    return Err(SourceError::Http(e));
                }
            }
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) {
                    return Ok(response);
                }
                if attempt >= MAX_RETRIES {
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                        message: format!("HTTP {status} after {MAX_RETRIES} retries"),
                    });
                }
                log::warn!("  HTTP {status} (retryable)");
            }
        }

        attempt += 1;
        let delay = backoff_delay(attempt);
        log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

/// Delay before retry number `attempt` (1-based): 1s, 2s, 4s, ...
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1).min(6))
}

/// Whether a response status is worth retrying (429 or 5xx).
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}
