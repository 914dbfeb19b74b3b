//! Outbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Facade builds a RequestSpec
//!     → request.rs (method, path, query, JSON body; request ID per attempt)
//!     → client.rs (reqwest call under a per-call timeout)
//!     → response.rs (status, rate-limit headers, buffered body)
//!     → handed back to the retry layer for classification
//! ```

pub mod client;
pub mod request;
pub mod response;

pub use client::{HttpClient, HttpClientError};
pub use request::{RequestId, RequestSpec, X_REQUEST_ID};
pub use response::{ApiResponse, RateLimitInfo};
