//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Facade call for service S:
//!     → circuit_breaker.rs (pre-check: refuse fast while OPEN)
//!     → queue.rs (wait for S's turn, spaced from the previous call)
//!     → circuit_breaker.rs (admission, HALF_OPEN trial call, outcome accounting)
//!     → retries.rs (classify, back off, honor rate-limit resets)
//!         → timeouts.rs (deadline on each real call)
//! ```
//!
//! # Design Decisions
//! - One breaker and one queue per service key; services never share state
//! - Retries happen inside the breaker, so one logical request counts once
//! - Every external call has a deadline

pub mod backoff;
pub mod circuit_breaker;
pub mod queue;
pub mod retries;
pub mod timeouts;

pub use backoff::{calculate_backoff, BackoffPolicy};
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use queue::RequestQueue;
pub use retries::{RetryPolicy, RetryingFetcher};
pub use timeouts::with_timeout;
