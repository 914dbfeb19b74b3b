//! Result caching.
//!
//! # Data Flow
//! ```text
//! Facade request:
//!     → fingerprint.rs (stable key from service + semantic inputs)
//!     → ttl.rs lookup (fresh hit short-circuits the whole pipeline)
//!     → on success only: ttl.rs insert
//! ```
//!
//! # Design Decisions
//! - Failures are never cached
//! - Expiry is lazy; no background sweeper task
//! - Entries are independent per facade, so services never see each other's keys

pub mod fingerprint;
pub mod ttl;

pub use fingerprint::Fingerprint;
pub use ttl::TtlCache;
