//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the service registry
//! - Build one HTTP client per remote, with that service's timeout
//! - Assemble the facades
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Queue workers are spawned lazily by the registry, so `build` must run
//!   inside a Tokio runtime

use std::sync::Arc;
use thiserror::Error;

use crate::config::{validate_config, ShieldConfig, ValidationError};
use crate::http::{HttpClient, HttpClientError};
use crate::registry::ServiceRegistry;
use crate::resilience::CircuitSnapshot;
use crate::services::{FileStore, MarkdownRenderer, FILE_STORE, MARKDOWN_RENDERER};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("{service}: {source}")]
    Client {
        service: &'static str,
        #[source]
        source: HttpClientError,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The assembled access layer.
#[derive(Debug, Clone)]
pub struct Shield {
    pub registry: Arc<ServiceRegistry>,
    pub markdown: MarkdownRenderer,
    pub files: FileStore,
}

impl Shield {
    pub fn statuses(&self) -> Vec<CircuitSnapshot> {
        self.registry.statuses()
    }

    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}

/// Build every subsystem from `config`.
pub fn build(config: ShieldConfig) -> Result<Shield, StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;

    let http = config.http.clone();
    let markdown_http = HttpClient::new(
        &http.markdown_base_url,
        &http.user_agent,
        config.service(MARKDOWN_RENDERER).timeouts.request(),
    )
    .map_err(|source| StartupError::Client {
        service: MARKDOWN_RENDERER,
        source,
    })?;

    let mut files_http = HttpClient::new(
        &http.file_store_base_url,
        &http.user_agent,
        config.service(FILE_STORE).timeouts.request(),
    )
    .map_err(|source| StartupError::Client {
        service: FILE_STORE,
        source,
    })?;
    match http.file_store_token {
        Some(token) => files_http = files_http.with_bearer(token),
        None => tracing::warn!("No file store token configured; downloads will likely be rejected"),
    }

    let registry = Arc::new(ServiceRegistry::new(config));
    let markdown = MarkdownRenderer::new(&registry, markdown_http);
    let files = FileStore::new(&registry, files_http);

    tracing::info!(
        markdown = %markdown.client().service(),
        files = %files.client().service(),
        "Access layer ready"
    );

    Ok(Shield {
        registry,
        markdown,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_with_defaults() {
        let shield = build(ShieldConfig::default()).unwrap();
        // breakers exist from construction
        let services: Vec<_> = shield.statuses().into_iter().map(|s| s.service).collect();
        assert_eq!(services, vec![FILE_STORE, MARKDOWN_RENDERER]);
        shield.shutdown();
    }

    #[tokio::test]
    async fn test_build_rejects_bad_url() {
        let mut config = ShieldConfig::default();
        config.http.markdown_base_url = "not a url".to_string();
        let err = build(config).unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));
    }
}
