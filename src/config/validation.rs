//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and URLs. Every problem is
//! reported, not just the first one.

use std::fmt;
use url::Url;

use crate::config::schema::{ServiceConfig, ShieldConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_service("defaults", &config.defaults, &mut errors);
    let mut keys: Vec<_> = config.services.keys().collect();
    keys.sort();
    for key in keys {
        if key.trim().is_empty() {
            errors.push(ValidationError::new("services", "service key must not be empty"));
        }
        validate_service(&format!("services.{key}"), &config.services[key], &mut errors);
    }

    for (field, value) in [
        ("http.markdown_base_url", &config.http.markdown_base_url),
        ("http.file_store_base_url", &config.http.file_store_base_url),
    ] {
        if let Err(e) = Url::parse(value) {
            errors.push(ValidationError::new(field, format!("invalid URL '{value}': {e}")));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(prefix: &str, svc: &ServiceConfig, errors: &mut Vec<ValidationError>) {
    let mut check = |ok: bool, field: &str, message: &str| {
        if !ok {
            errors.push(ValidationError::new(format!("{prefix}.{field}"), message));
        }
    };

    check(svc.breaker.failure_threshold > 0, "breaker.failure_threshold", "must be at least 1");
    check(
        svc.breaker.half_open_success_threshold > 0,
        "breaker.half_open_success_threshold",
        "must be at least 1",
    );
    check(svc.retry.max_attempts > 0, "retry.max_attempts", "must be at least 1");
    check(
        svc.retry.base_delay_ms <= svc.retry.max_delay_ms,
        "retry.base_delay_ms",
        "must not exceed retry.max_delay_ms",
    );
    check(svc.retry.max_elapsed_secs > 0, "retry.max_elapsed_secs", "must be positive");
    check(svc.cache.ttl_secs > 0, "cache.ttl_secs", "must be positive");
    check(svc.cache.max_entries != Some(0), "cache.max_entries", "must be positive when set");
    check(svc.timeouts.request_secs > 0, "timeouts.request_secs", "must be positive");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ShieldConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = ShieldConfig::default();
        config.defaults.breaker.failure_threshold = 0;
        config.defaults.cache.ttl_secs = 0;
        config.http.markdown_base_url = "not a url".into();

        let mut bad = ServiceConfig::default();
        bad.retry.base_delay_ms = 20_000;
        config.services.insert("render".into(), bad);

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"defaults.breaker.failure_threshold"));
        assert!(fields.contains(&"defaults.cache.ttl_secs"));
        assert!(fields.contains(&"services.render.retry.base_delay_ms"));
        assert!(fields.contains(&"http.markdown_base_url"));
        assert_eq!(errors.len(), 4);
    }
}
