//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → ServiceRegistry → per-service HttpClient → facades
//!
//! Shutdown (shutdown.rs):
//!     Trigger → queue workers stop → pending callers get QueueError::Closed
//!
//! Signals (signals.rs):
//!     SIGINT → caller triggers shutdown
//! ```
//!
//! # Design Decisions
//! - Startup fails fast on a bad base URL; nothing is spawned before config is valid
//! - Workers finish their in-flight operation before exiting

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build, Shield, StartupError};
