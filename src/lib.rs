//! Resilient access layer for flaky, rate-limited HTTP APIs.
//!
//! Each external integration (a "service key") gets its own circuit breaker,
//! spaced request queue, retry policy and result cache. Facades in
//! [`services`] compose them around real HTTP calls.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod services;

pub use config::ShieldConfig;
pub use error::{FetchError, ServiceError};
pub use lifecycle::{build, Shield, Shutdown};
pub use registry::ServiceRegistry;
pub use services::{FileStore, MarkdownRenderer, RenderMode, Rendered};
