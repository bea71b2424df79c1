//! Exponential backoff for transient upstream failures.
//!
//! Retrying is opt-in: [`RetryConfig::default`] allows zero extra attempts, so
//! a run makes exactly one request per stage unless the configuration says
//! otherwise. Only errors whose [`IsRetryable::is_retryable`] returns `true`
//! (rate limits, network failures, 5xx statuses) are ever repeated.
//!
//! Every wait is capped by `max_delay_ms`, including the first.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, UpstreamError};

/// Classifies errors as transient or permanent.
pub trait IsRetryable {
    /// Returns true if the same operation could succeed when repeated.
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        self.upstream().is_some_and(UpstreamError::is_retryable)
    }
}

/// Backoff policy for upstream requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first failure. Zero disables retrying.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Randomize each delay between 1x and 2x.
    pub jitter: bool,
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Whether any retry can happen under this policy.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Reject values that cannot produce a usable delay sequence.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::invalid_setting(
                "retry.backoff_multiplier",
                format!(
                    "must be a finite number of at least 1.0, got {}",
                    self.backoff_multiplier
                ),
            ));
        }
        Ok(())
    }

    fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms).min(self.max_delay())
    }

    fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// The delay following `delay`, saturating at `max_delay_ms`.
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
            .map_or_else(|_| self.max_delay(), |next| next.min(self.max_delay()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Run `operation`, retrying retryable failures with exponential backoff.
///
/// Returns the first success, or the last error once attempts are exhausted
/// or a non-retryable error occurs.
pub async fn with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay();

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;
                let wait = if config.jitter {
                    add_jitter(delay).min(config.max_delay())
                } else {
                    delay
                };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = wait.as_millis(),
                    "request failed, retrying"
                );

                tokio::time::sleep(wait).await;
                delay = config.next_delay(delay);
            }
            Err(e) => {
                if attempt > 0 {
                    tracing::warn!(error = %e, attempts = attempt + 1, "giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

fn add_jitter(delay: Duration) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + fastrand::f64()))
        .unwrap_or(Duration::MAX)
}
