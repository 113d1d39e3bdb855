//! Retry with exponential back-off and jitter for provider calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors only. Malformed payloads are returned immediately —
//! the provider will keep returning the same body, so retrying wastes the
//! per-request quota.

use std::future::Future;
use std::time::Duration;

use crate::error::InstagramError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 5xx responses.
///
/// **Not retriable (hard stop):**
/// - [`InstagramError::MalformedData`] — same body on every attempt.
/// - [`InstagramError::Deserialize`] — same body on every attempt.
/// - Non-5xx [`InstagramError::UnexpectedStatus`] — auth or quota problem.
pub(crate) fn is_retriable(err: &InstagramError) -> bool {
    match err {
        InstagramError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        InstagramError::UnexpectedStatus { status, .. } => *status >= 500,
        InstagramError::MalformedData { .. }
        | InstagramError::Deserialize { .. }
        | InstagramError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors, sleeping `backoff_base_ms * 2^(attempt-1)` with ±25 %
/// jitter between attempts, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, InstagramError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InstagramError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "provider transient error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
