//! Error taxonomy for outbound calls.
//!
//! # Layers
//! ```text
//! HttpClient / attempt   → FetchError     (one real call: status, network, timeout)
//! CircuitBreaker         → CircuitError   (admission refused, or the inner error)
//! RequestQueue           → QueueError     (worker gone)
//! Facade                 → ServiceError   (what business callers see)
//! ```
//!
//! A cache miss is not an error; lookups return `Option`.

use std::time::Duration;
use thiserror::Error;

use crate::http::response::RateLimitInfo;

/// How the retrying fetcher should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Waiting cannot fix it (401, 403, 404, other 4xx, malformed requests).
    Fatal,
    /// Rate limiting, server faults, network trouble.
    Retryable,
}

/// Failure of a single outbound call.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        rate_limit: RateLimitInfo,
    },

    /// Connection refused, reset, DNS failure, truncated body.
    #[error("network error: {0}")]
    Network(String),

    /// The per-call deadline elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built locally (bad path, bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The call aborted inside this process (a panicking operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FetchError {
    /// Build a status error without rate-limit metadata.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        FetchError::Status {
            status,
            message: message.into(),
            rate_limit: RateLimitInfo::default(),
        }
    }

    /// HTTP status code, if the remote answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the remote is telling us to slow down.
    ///
    /// A 403 with an exhausted quota counter is how several public APIs report
    /// rate limiting, so it is treated the same as a 429.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            FetchError::Status { status: 429, .. } => true,
            FetchError::Status {
                status: 403,
                rate_limit,
                ..
            } => rate_limit.remaining == Some(0),
            _ => false,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) => ErrorClass::Retryable,
            FetchError::InvalidRequest(_) | FetchError::Internal(_) => ErrorClass::Fatal,
            FetchError::Status { status, .. } => {
                if self.is_rate_limited() || (500..600).contains(status) {
                    ErrorClass::Retryable
                } else {
                    ErrorClass::Fatal
                }
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    /// Rate-limit headers carried by the failed response, if any.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            FetchError::Status { rate_limit, .. } => Some(rate_limit),
            _ => None,
        }
    }
}

/// Outcome of a call routed through a circuit breaker.
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// Admission refused; the operation was never invoked.
    #[error("circuit for '{service}' is open (retry in {retry_in:?}): {last_error}")]
    Open {
        service: String,
        last_error: String,
        retry_in: Duration,
    },

    /// The operation ran and failed. Passed through unchanged.
    #[error(transparent)]
    Inner(E),
}

impl<E> CircuitError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }
}

/// Failure to get a result back from a service queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The per-service queue worker is no longer running.
    #[error("request queue is closed")]
    Closed,

    /// The operation panicked; the worker carried on with the next one.
    #[error("queued operation panicked")]
    Panicked,
}

/// Error surfaced at the facade boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service is judged unhealthy; no network attempt was made.
    #[error("{service} is unavailable (circuit open, retry in {}s): {last_error}", .retry_in.as_secs())]
    CircuitOpen {
        service: String,
        last_error: String,
        retry_in: Duration,
    },

    /// A real call was made and failed (after any retries).
    #[error("{service} request failed: {source}")]
    Request {
        service: String,
        #[source]
        source: FetchError,
    },

    /// The remote answered successfully but the payload was unusable.
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse { service: String, message: String },

    /// The application is shutting down.
    #[error("{service} is shutting down")]
    Shutdown { service: String },
}

impl ServiceError {
    pub(crate) fn from_circuit(service: &str, err: CircuitError<FetchError>) -> Self {
        match err {
            CircuitError::Open {
                last_error,
                retry_in,
                ..
            } => ServiceError::CircuitOpen {
                service: service.to_string(),
                last_error,
                retry_in,
            },
            CircuitError::Inner(source) => ServiceError::Request {
                service: service.to_string(),
                source,
            },
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ServiceError::CircuitOpen { .. })
    }

    /// Whether the caller may reasonably try the same call again right away.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Request { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Short text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::CircuitOpen {
                service, retry_in, ..
            } => format!(
                "{service} is temporarily unavailable. Please wait about {} seconds.",
                retry_in.as_secs().max(1)
            ),
            ServiceError::Request { service, source } => match source.status_code() {
                Some(401) | Some(403) if !source.is_rate_limited() => {
                    format!("{service} refused the request. Check your credentials.")
                }
                Some(404) => format!("{service} could not find what was requested."),
                _ if source.is_rate_limited() => {
                    format!("{service} is rate limiting requests. Please try again later.")
                }
                _ => format!("{service} failed to respond. Please try again."),
            },
            ServiceError::InvalidResponse { service, .. } => {
                format!("{service} returned something unexpected.")
            }
            ServiceError::Shutdown { service } => format!("{service} is shutting down."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_remaining(status: u16, remaining: u64) -> FetchError {
        FetchError::Status {
            status,
            message: String::new(),
            rate_limit: RateLimitInfo {
                remaining: Some(remaining),
                ..RateLimitInfo::default()
            },
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(FetchError::status(429, "").class(), ErrorClass::Retryable);
        assert_eq!(FetchError::status(500, "").class(), ErrorClass::Retryable);
        assert_eq!(FetchError::status(503, "").class(), ErrorClass::Retryable);
        assert_eq!(FetchError::status(401, "").class(), ErrorClass::Fatal);
        assert_eq!(FetchError::status(403, "").class(), ErrorClass::Fatal);
        assert_eq!(FetchError::status(404, "").class(), ErrorClass::Fatal);
        assert_eq!(FetchError::Network("reset".into()).class(), ErrorClass::Retryable);
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::Retryable
        );
    }

    #[test]
    fn test_exhausted_quota_403_is_rate_limit() {
        assert!(with_remaining(403, 0).is_rate_limited());
        assert!(with_remaining(403, 0).is_retryable());
        assert!(!with_remaining(403, 12).is_retryable());
    }

    #[test]
    fn test_circuit_open_is_distinct() {
        let open = ServiceError::from_circuit(
            "render",
            CircuitError::Open {
                service: "render".into(),
                last_error: "HTTP 500".into(),
                retry_in: Duration::from_secs(30),
            },
        );
        assert!(open.is_circuit_open());
        assert!(!open.is_retryable());
        assert!(open.user_message().contains("wait"));

        let failed =
            ServiceError::from_circuit("render", CircuitError::Inner(FetchError::status(502, "")));
        assert!(!failed.is_circuit_open());
        assert!(failed.is_retryable());
        assert!(failed.user_message().contains("try again"));
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::status(404, "Not Found");
        assert_eq!(err.to_string(), "HTTP 404: Not Found");

        let err: CircuitError<FetchError> = CircuitError::Inner(FetchError::Network("reset".into()));
        assert_eq!(err.to_string(), "network error: reset");
    }
}
