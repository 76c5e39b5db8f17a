//! Bounded exponential backoff
//!
//! Used for locked-database retries and for idempotent transport reads.
//! Pack mutations never go through here.

use std::future::Future;
use std::time::Duration;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Exponential backoff: 10 ms, doubling, capped at 1 s
#[derive(Debug, Clone)]
pub struct Backoff {
    next_ms: u64,
    max_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF_MS, MAX_BACKOFF_MS)
    }
}

impl Backoff {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            next_ms: initial_ms.min(max_ms),
            max_ms,
        }
    }

    /// Delay for this attempt; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.next_ms);
        self.next_ms = (self.next_ms * 2).min(self.max_ms);
        delay
    }

    pub fn reset(&mut self, initial_ms: u64) {
        self.next_ms = initial_ms.min(self.max_ms);
    }
}

/// Retry `operation` while `is_retryable` says so, at most `max_attempts` times
pub async fn retry_idempotent<F, Fut, T, E, R>(
    operation_name: &str,
    max_attempts: u32,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff = Backoff::default();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if attempt > 1 {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Operation failed after retries"
                    );
                }
                return Err(err);
            }
        }
    }
}
