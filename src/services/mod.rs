//! Service facades.
//!
//! # Data Flow
//! ```text
//! Business call (render / load_file):
//!     → cache lookup (hit returns immediately)
//!     → breaker pre-check (open circuit fails fast, no queue slot used)
//!     → service queue (spaced, FIFO)
//!         → breaker.call
//!             → retrying fetcher
//!                 → HttpClient::send (one real call, with deadline)
//!     → on success: cache insert, return
//!     → on failure: ServiceError, nothing cached
//! ```
//!
//! # Design Decisions
//! - `ServiceClient` owns the queue → breaker → retry pipeline; facades own
//!   caching and payload handling
//! - Open-circuit and remote failures stay distinct variants of `ServiceError`

pub mod file_store;
pub mod markdown;

pub use file_store::{FileStore, FILE_STORE};
pub use markdown::{MarkdownRenderer, RenderMode, Rendered, MARKDOWN_RENDERER};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CircuitError, FetchError, QueueError, ServiceError};
use crate::http::{ApiResponse, HttpClient, RequestSpec};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::resilience::{CircuitBreaker, RequestQueue, RetryPolicy, RetryingFetcher};

/// Queue → breaker → retry pipeline for one service key.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: String,
    http: HttpClient,
    breaker: Arc<CircuitBreaker>,
    queue: RequestQueue,
    fetcher: RetryingFetcher,
}

impl ServiceClient {
    /// Bind `http` to the shared breaker and queue for `service`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(service: &str, registry: &ServiceRegistry, http: HttpClient) -> Self {
        let config = registry.config().service(service);
        Self {
            service: service.to_string(),
            http,
            breaker: registry.breaker(service),
            queue: registry.queue(service),
            fetcher: RetryingFetcher::new(service, RetryPolicy::from(&config.retry)),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run `request` through the pipeline and return the successful response.
    pub async fn execute(&self, request: RequestSpec) -> Result<ApiResponse, ServiceError> {
        let start = Instant::now();

        if self.breaker.is_rejecting() {
            let snapshot = self.breaker.snapshot();
            metrics::record_circuit_rejection(&self.service);
            metrics::record_request(&self.service, "circuit_open", start);
            tracing::debug!(service = %self.service, "Circuit open, skipping queue");
            return Err(ServiceError::CircuitOpen {
                service: self.service.clone(),
                last_error: snapshot
                    .last_error
                    .unwrap_or_else(|| "unknown error".to_string()),
                retry_in: Duration::from_millis(snapshot.retry_in_ms.unwrap_or(0)),
            });
        }

        let http = self.http.clone();
        let breaker = self.breaker.clone();
        let fetcher = self.fetcher.clone();
        let queued = self
            .queue
            .enqueue(move || async move {
                breaker
                    .call(|| fetcher.fetch(|| http.send(&request)))
                    .await
            })
            .await;

        let result = self.settle(queued);
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_circuit_open() => "circuit_open",
            Err(ServiceError::Shutdown { .. }) => "shutdown",
            Err(_) => "error",
        };
        metrics::record_request(&self.service, outcome, start);
        result
    }

    /// Map what came back from the queue onto the facade error taxonomy.
    fn settle(
        &self,
        queued: Result<Result<ApiResponse, CircuitError<FetchError>>, QueueError>,
    ) -> Result<ApiResponse, ServiceError> {
        match queued {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ServiceError::from_circuit(&self.service, e)),
            Err(QueueError::Panicked) => {
                let source = FetchError::Internal("request handler panicked".to_string());
                self.breaker.record_failure(source.to_string());
                Err(ServiceError::Request {
                    service: self.service.clone(),
                    source,
                })
            }
            Err(QueueError::Closed) => Err(ServiceError::Shutdown {
                service: self.service.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShieldConfig;
    use crate::resilience::CircuitState;

    fn client(registry: &ServiceRegistry) -> ServiceClient {
        let http = HttpClient::new("http://127.0.0.1:9", "test", Duration::from_secs(1)).unwrap();
        ServiceClient::new("render", registry, http)
    }

    #[tokio::test]
    async fn test_panicked_operation_is_a_request_failure() {
        let mut config = ShieldConfig::default();
        config.defaults.breaker.failure_threshold = 1;
        let registry = ServiceRegistry::new(config);
        let client = client(&registry);

        let err = client.settle(Err(QueueError::Panicked)).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Request {
                source: FetchError::Internal(_),
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert_eq!(client.breaker().state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_closed_queue_is_shutdown() {
        let registry = ServiceRegistry::new(ShieldConfig::default());
        let client = client(&registry);

        let err = client.settle(Err(QueueError::Closed)).unwrap_err();
        assert!(matches!(err, ServiceError::Shutdown { .. }));
        assert_eq!(client.breaker().snapshot().failure_count, 0);
    }
}
