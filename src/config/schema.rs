//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the access layer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration.
///
/// A `[services.<key>]` table only needs the fields that differ; everything it
/// leaves out is taken from `[defaults]`, field by field.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(try_from = "RawShieldConfig")]
pub struct ShieldConfig {
    /// Settings applied to every service key without an override.
    pub defaults: ServiceConfig,

    /// Effective settings per service key (e.g. "markdown-renderer"),
    /// already resolved against `defaults`.
    pub services: HashMap<String, ServiceConfig>,

    /// Remote endpoints and credentials.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ShieldConfig {
    /// Resolve the effective settings for a service key.
    pub fn service(&self, key: &str) -> ServiceConfig {
        self.services
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }
}

/// On-disk shape: service sections are kept as raw tables until they are
/// layered over `defaults`.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawShieldConfig {
    defaults: toml::Table,
    services: HashMap<String, toml::Table>,
    http: HttpConfig,
    observability: ObservabilityConfig,
}

impl TryFrom<RawShieldConfig> for ShieldConfig {
    type Error = toml::de::Error;

    fn try_from(raw: RawShieldConfig) -> Result<Self, Self::Error> {
        let defaults: ServiceConfig = toml::Value::Table(raw.defaults.clone()).try_into()?;

        let mut services = HashMap::with_capacity(raw.services.len());
        for (key, overrides) in raw.services {
            let mut merged = raw.defaults.clone();
            merge_tables(&mut merged, overrides);
            services.insert(key, toml::Value::Table(merged).try_into()?);
        }

        Ok(Self {
            defaults,
            services,
            http: raw.http,
            observability: raw.observability,
        })
    }
}

/// Deep-merge `overlay` into `base`; nested tables merge, scalars replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}

/// Resilience settings for one external integration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub breaker: BreakerConfig,
    pub queue: QueueConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub timeouts: TimeoutConfig,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures in Closed before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds the circuit stays Open before a trial call is allowed.
    pub reset_timeout_secs: u64,

    /// Consecutive Half-Open successes needed to close again.
    pub half_open_success_threshold: u32,
}

impl BreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 30,
            half_open_success_threshold: 2,
        }
    }
}

/// Request queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Minimum gap between one call settling and the next starting.
    pub min_spacing_ms: u64,
}

impl QueueConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: 1000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of invocations per logical request, first one included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay.
    pub jitter_ms: u64,

    /// Longest rate-limit reset the fetcher will sleep through.
    pub courtesy_wait_max_secs: u64,

    /// Wall-clock cap for one logical request, waits included.
    pub max_elapsed_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
            jitter_ms: 1000,
            courtesy_wait_max_secs: 300,
            max_elapsed_secs: 360,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Optional cap on stored entries.
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 6 * 60 * 60,
            max_entries: Some(1024),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for one outbound call (connect + response + body).
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 15 }
    }
}

/// Remote endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL of the markdown rendering API.
    pub markdown_base_url: String,

    /// Base URL of the file store content API.
    pub file_store_base_url: String,

    /// Bearer token for the file store.
    pub file_store_token: Option<String>,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            markdown_base_url: "https://api.github.com".to_string(),
            file_store_base_url: "https://content.dropboxapi.com/2/files".to_string(),
            file_store_token: None,
            user_agent: concat!("api-shield/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShieldConfig::default();
        let svc = config.service("markdown-renderer");
        assert_eq!(svc.breaker.failure_threshold, 5);
        assert_eq!(svc.breaker.reset_timeout(), Duration::from_secs(30));
        assert_eq!(svc.breaker.half_open_success_threshold, 2);
        assert_eq!(svc.queue.min_spacing(), Duration::from_secs(1));
        assert_eq!(svc.retry.max_attempts, 3);
        assert_eq!(svc.retry.base_delay_ms, 1000);
    }

    #[test]
    fn test_service_override() {
        let raw = r#"
            [defaults.breaker]
            failure_threshold = 4

            [services.render.breaker]
            failure_threshold = 3
            reset_timeout_secs = 5

            [services.render.queue]
            min_spacing_ms = 250
        "#;
        let config: ShieldConfig = toml::from_str(raw).unwrap();

        let render = config.service("render");
        assert_eq!(render.breaker.failure_threshold, 3);
        assert_eq!(render.breaker.reset_timeout_secs, 5);
        assert_eq!(render.breaker.half_open_success_threshold, 2);
        assert_eq!(render.queue.min_spacing_ms, 250);

        let other = config.service("file-store");
        assert_eq!(other.breaker.failure_threshold, 4);
    }

    #[test]
    fn test_partial_override_keeps_configured_defaults() {
        let raw = r#"
            [defaults.retry]
            max_attempts = 1

            [defaults.queue]
            min_spacing_ms = 0

            [defaults.breaker]
            reset_timeout_secs = 90

            [services.file-store.breaker]
            failure_threshold = 3
        "#;
        let config: ShieldConfig = toml::from_str(raw).unwrap();

        let files = config.service("file-store");
        assert_eq!(files.breaker.failure_threshold, 3);
        assert_eq!(files.breaker.reset_timeout_secs, 90);
        assert_eq!(files.retry.max_attempts, 1);
        assert_eq!(files.queue.min_spacing_ms, 0);
        // untouched everywhere: built-in default
        assert_eq!(files.retry.base_delay_ms, 1000);

        let other = config.service("markdown-renderer");
        assert_eq!(other.breaker.failure_threshold, 5);
        assert_eq!(other.retry.max_attempts, 1);
    }

    #[test]
    fn test_override_type_error_is_reported() {
        let raw = r#"
            [services.render.queue]
            min_spacing_ms = "fast"
        "#;
        assert!(toml::from_str::<ShieldConfig>(raw).is_err());
    }

    #[test]
    fn test_log_format_parse() {
        let raw = r#"
            [observability]
            log_format = "json"
        "#;
        let config: ShieldConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
