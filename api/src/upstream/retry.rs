//! Retry with exponential backoff and jitter for upstream calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::UpstreamError;

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    ///
    /// `min(base * 2^retry, max_delay)` scaled by a random factor in `[0.8, 1.2]`:
    /// - retry 0: ~500ms (400ms - 600ms)
    /// - retry 1: ~1s (800ms - 1.2s)
    /// - retry 2: ~2s (1.6s - 2.4s)
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let capped_ms = base_ms
            .saturating_mul(2u64.saturating_pow(retry))
            .min(self.max_delay.as_millis() as u64);
        let factor: f64 = rand::thread_rng().gen_range(0.8..=1.2);
        Duration::from_millis((capped_ms as f64 * factor).round() as u64)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the attempt budget
    /// is spent. The last error is returned when attempts run out.
    pub async fn run<T, F, Fut>(&self, service: &str, mut op: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.backoff_delay(attempt - 1);
                    tracing::warn!(
                        service,
                        attempt,
                        max_attempts = attempts,
                        status = err.status(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "upstream call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::error!(service, attempts, error = %err, "upstream retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}
