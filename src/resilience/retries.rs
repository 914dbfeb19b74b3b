//! Retry logic.
//!
//! # Responsibilities
//! - Classify each attempt's outcome as success, fatal or retryable
//! - Execute retries with exponential backoff + jitter
//! - Honor a near rate-limit reset with one bounded courtesy wait
//! - Enforce a wall-clock budget for the whole logical request
//!
//! # Design Decisions
//! - Never retry 401/403/404 and other client errors
//! - 429, 5xx, connection errors and timeouts are retryable
//! - Jittered backoff prevents synchronized retry storms
//! - A planned sleep that would overrun the budget surfaces the last error instead

use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::time::{sleep, Instant};

use crate::config::RetryConfig;
use crate::error::FetchError;
use crate::http::ApiResponse;
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, BackoffPolicy};

/// Retry parameters for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations allowed, first one included.
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Longest rate-limit reset worth sleeping through.
    pub courtesy_wait_max: Duration,
    /// Wall-clock cap for one logical request.
    pub max_elapsed: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: BackoffPolicy::from(config),
            courtesy_wait_max: Duration::from_secs(config.courtesy_wait_max_secs),
            max_elapsed: Duration::from_secs(config.max_elapsed_secs),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Wraps a single outbound call with classification and retries.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    service: String,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(service: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            service: service.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `attempt` until it succeeds, fails fatally, or the budget runs out.
    ///
    /// `attempt` may report a failed call either as `Err` or as an `Ok`
    /// response with a non-success status; both are classified the same way.
    pub async fn fetch<F, Fut>(&self, mut attempt: F) -> Result<ApiResponse, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ApiResponse, FetchError>>,
    {
        let deadline = Instant::now() + self.policy.max_elapsed;
        let mut courtesy_used = false;
        let mut attempts = 0u32;

        loop {
            let error = match attempt().await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => response.into_error(),
                Err(e) => e,
            };
            attempts += 1;

            if !error.is_retryable() {
                tracing::warn!(service = %self.service, attempt = attempts, error = %error, "Request failed, not retryable");
                return Err(error);
            }
            if attempts >= self.policy.max_attempts {
                tracing::warn!(service = %self.service, attempts, error = %error, "Retries exhausted");
                return Err(error);
            }

            let (delay, reason) = self.next_delay(attempts - 1, &error, &mut courtesy_used);
            if Instant::now() + delay > deadline {
                tracing::warn!(
                    service = %self.service,
                    attempts,
                    delay = ?delay,
                    budget = ?self.policy.max_elapsed,
                    error = %error,
                    "Retry would exceed request budget, giving up"
                );
                return Err(error);
            }

            tracing::info!(service = %self.service, attempt = attempts, delay = ?delay, reason, error = %error, "Retrying request");
            metrics::record_retry(&self.service, reason);
            sleep(delay).await;
        }
    }

    /// Delay before the next attempt and the reason label for metrics.
    fn next_delay(
        &self,
        retry: u32,
        error: &FetchError,
        courtesy_used: &mut bool,
    ) -> (Duration, &'static str) {
        if error.is_rate_limited() {
            if !*courtesy_used {
                let hint = error
                    .rate_limit()
                    .and_then(|info| info.wait_hint(SystemTime::now()));
                if let Some(wait) = hint.filter(|w| *w <= self.policy.courtesy_wait_max) {
                    *courtesy_used = true;
                    return (wait, "rate_limit_reset");
                }
            }
            return (calculate_backoff(retry, &self.policy.backoff), "rate_limited");
        }
        (calculate_backoff(retry, &self.policy.backoff), "transient")
    }
}
