//! Exponential-backoff retry for flaky portal requests
//!
//! The portal drops requests often enough during peak hours that every
//! sync fetch runs under this helper. Backoff doubles per attempt from a
//! base delay, with a small random jitter so parallel fetches spread out.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default number of attempts
pub const DEFAULT_RETRIES: u32 = 3;

/// Default base delay between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the per-attempt random jitter
const MAX_JITTER_MS: u64 = 100;

/// Run `op` until it succeeds or `retries` attempts are exhausted.
///
/// Attempt `n` (zero-based) fails into a sleep of `delay * 2^n` plus up
/// to 100ms of jitter; the last failure also waits out its backoff before
/// surfacing. The error of the final attempt is returned untouched.
/// `retries` below 1 is treated as 1.
pub async fn retry<T, E, F, Fut>(mut op: F, retries: u32, delay: Duration) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = retries.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let backoff = delay.saturating_mul(2u32.saturating_pow(attempt));
                let jitter = Duration::from_millis(rand::rng().random_range(0..MAX_JITTER_MS));
                debug!(
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "attempt failed, backing off"
                );
                tokio::time::sleep(backoff + jitter).await;

                attempt += 1;
                if attempt >= attempts {
                    return Err(err);
                }
            }
        }
    }
}

/// Retry with the default attempt count and base delay
pub async fn retry_default<T, E, F, Fut>(op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry(op, DEFAULT_RETRIES, DEFAULT_DELAY).await
}
