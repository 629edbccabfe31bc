//! Bounded retry with exponential backoff.
//!
//! [`RetryPolicy`] runs an async operation up to `max_retries` times, sleeping
//! `min(base_delay * 2^k, max_delay)` after failed attempt `k`. Only the final
//! attempt's error reaches the caller; earlier ones are dropped.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Number of attempts actually made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay after failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Retry wrapper with observable progress.
///
/// `is_in_progress` stays true from the first attempt of a call until it
/// resolves. `last_error` is cleared when a call starts and set only when a
/// call fails for good.
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    in_flight: AtomicUsize,
    last_error: Mutex<Option<SyncError>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            in_flight: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    fn set_last_error(&self, error: Option<SyncError>) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = error;
        }
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(operation, None).await
    }

    /// Same as [`RetryPolicy::run`], abandoning the sequence as soon as
    /// `cancel` fires, whether mid-attempt or mid-backoff.
    pub async fn run_with_cancel<T, F, Fut>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(operation, Some(cancel)).await
    }

    async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = InFlight::enter(&self.in_flight);
        self.set_last_error(None);

        let attempts = self.config.attempts();
        let mut attempt = 0;
        loop {
            let outcome = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(SyncError::Cancelled),
                    result = operation() => result,
                },
                None => operation().await,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if error == SyncError::Cancelled || attempt + 1 >= attempts {
                self.set_last_error(Some(error.clone()));
                return Err(error);
            }

            let delay = self.config.delay_for_attempt(attempt);
            tracing::debug!(
                "[RETRY] attempt {}/{} failed, backing off {}ms",
                attempt + 1,
                attempts,
                delay.as_millis()
            );
            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            self.set_last_error(Some(SyncError::Cancelled));
                            return Err(SyncError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }
}
