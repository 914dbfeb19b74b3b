//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShieldConfig (validated, immutable)
//!     → ShieldConfig::service(key) resolves per-integration settings
//!     → handed to ServiceRegistry at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers and queues read it once on creation
//! - All fields have defaults to allow minimal configs
//! - A service override is layered field by field over `[defaults]` at load time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::{
    BreakerConfig, CacheConfig, HttpConfig, LogFormat, ObservabilityConfig, QueueConfig,
    RetryConfig, ServiceConfig, ShieldConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
