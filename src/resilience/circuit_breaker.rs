//! Circuit breaker for external service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: probing whether the service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold (consecutive)
//! Open → Half-Open: first call at or after next_attempt
//! Half-Open → Closed: half_open_success_threshold consecutive successes
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per service key, owned by the registry
//! - Fail fast in Open state; the operation is never invoked
//! - The breaker never retries; it only decides admission
//! - State is mutated under a short synchronous lock before and after the
//!   awaited operation, never across it

use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::error::CircuitError;
use crate::observability::metrics;

/// Circuit state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_error: Option<String>,
    /// Time left until a trial call is allowed; only set while Open.
    pub retry_in_ms: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_error: Option<String>,
    next_attempt: Option<Instant>,
}

impl Inner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_error: None,
            next_attempt: None,
        }
    }
}

/// Per-service circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: BreakerConfig) -> Self {
        let service = service.into();
        metrics::record_circuit_state(&service, CircuitState::Closed as u8);
        Self {
            service,
            config,
            inner: Mutex::new(Inner::closed()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, without applying any pending Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// True if a call made now would be refused without invoking the operation.
    pub fn is_rejecting(&self) -> bool {
        let inner = self.lock();
        inner.state == CircuitState::Open
            && inner.next_attempt.is_some_and(|at| Instant::now() < at)
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        let now = Instant::now();
        CircuitSnapshot {
            service: self.service.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_error: inner.last_error.clone(),
            retry_in_ms: match inner.state {
                CircuitState::Open => inner
                    .next_attempt
                    .map(|at| at.saturating_duration_since(now).as_millis() as u64),
                _ => None,
            },
        }
    }

    /// Force Closed with zeroed counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = Inner::closed();
        tracing::info!(service = %self.service, "Circuit manually reset");
        metrics::record_circuit_state(&self.service, CircuitState::Closed as u8);
    }

    /// Run `operation` under circuit protection.
    ///
    /// Errors from the operation are returned unchanged inside
    /// [`CircuitError::Inner`] after the failure has been recorded.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.acquire::<E>()?;

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure(e.to_string());
                Err(CircuitError::Inner(e))
            }
        }
    }

    /// Count a failure that never reached [`CircuitBreaker::call`]'s
    /// bookkeeping, such as an operation that panicked.
    pub fn record_failure(&self, error: impl Into<String>) {
        self.on_failure(error.into());
    }

    /// Admission check; moves Open → Half-Open once the timeout has elapsed.
    fn acquire<E>(&self) -> Result<(), CircuitError<E>> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let now = Instant::now();
        let next_attempt = inner.next_attempt;
        match next_attempt {
            Some(at) if now < at => {
                metrics::record_circuit_rejection(&self.service);
                Err(CircuitError::Open {
                    service: self.service.clone(),
                    last_error: inner
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                    retry_in: at - now,
                })
            }
            _ => {
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
                inner.next_attempt = None;
                tracing::info!(service = %self.service, "Circuit half-open, probing service");
                metrics::record_circuit_state(&self.service, CircuitState::HalfOpen as u8);
                Ok(())
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            CircuitState::Closed => {
                if inner.failure_count > 0 {
                    inner.failure_count = 0;
                }
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.half_open_success_threshold {
                    *inner = Inner::closed();
                    tracing::info!(service = %self.service, "Circuit closed, service recovered");
                    metrics::record_circuit_state(&self.service, CircuitState::Closed as u8);
                }
            }
            // admitted before the trip; the open window stands
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, error: String) {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.trip(&mut inner, error);
                } else {
                    tracing::debug!(
                        service = %self.service,
                        failures = inner.failure_count,
                        threshold = self.config.failure_threshold,
                        error = %error,
                        "Circuit recorded failure"
                    );
                    inner.last_error = Some(error);
                }
            }
            CircuitState::HalfOpen => {
                inner.failure_count += 1;
                self.trip(&mut inner, error);
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&self, inner: &mut Inner, error: String) {
        let reset_timeout: Duration = self.config.reset_timeout();
        tracing::warn!(
            service = %self.service,
            from = inner.state.as_str(),
            failures = inner.failure_count,
            reset_timeout_secs = reset_timeout.as_secs(),
            error = %error,
            "Circuit opened"
        );
        inner.state = CircuitState::Open;
        inner.success_count = 0;
        inner.last_error = Some(error);
        inner.next_attempt = Some(Instant::now() + reset_timeout);
        metrics::record_circuit_state(&self.service, CircuitState::Open as u8);
    }
}
