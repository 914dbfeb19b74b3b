//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Parameters of the exponential schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
    pub jitter_ms: u64,
}

impl BackoffPolicy {
    /// Largest delay the schedule can ever produce.
    pub fn upper_bound(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
            jitter_ms: config.jitter_ms,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Delay before retry `attempt` (0-indexed): `min(base * 2^attempt + jitter, max)`.
pub fn calculate_backoff(attempt: u32, policy: &BackoffPolicy) -> Duration {
    let exponential_base = 2u64.saturating_pow(attempt);
    let delay_ms = policy.base_ms.saturating_mul(exponential_base);

    let jitter = if policy.jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=policy.jitter_ms)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(policy.max_ms))
}
