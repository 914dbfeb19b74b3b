//! File store facade.
//!
//! Downloads file content with a bearer token (`GET <base>/<path>`).
//! Successful downloads are cached by path.

use std::time::Instant;

use crate::cache::{Fingerprint, TtlCache};
use crate::error::{FetchError, ServiceError};
use crate::http::{HttpClient, RequestSpec};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::services::ServiceClient;

/// Service key of the file store.
pub const FILE_STORE: &str = "file-store";

#[derive(Debug, Clone)]
pub struct FileStore {
    client: ServiceClient,
    cache: TtlCache<Vec<u8>>,
}

impl FileStore {
    /// `http` should already carry the store's bearer token.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(registry: &ServiceRegistry, http: HttpClient) -> Self {
        let config = registry.config().service(FILE_STORE);
        Self {
            client: ServiceClient::new(FILE_STORE, registry, http),
            cache: TtlCache::new(FILE_STORE, &config.cache),
        }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Fetch the raw bytes stored at `path`.
    ///
    /// A missing file (404) or rejected token (401/403) fails on the first
    /// attempt; those are never retried.
    pub async fn load_file(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ServiceError::Request {
                service: FILE_STORE.to_string(),
                source: FetchError::InvalidRequest("empty file path".to_string()),
            });
        }

        let key = Fingerprint::new(FILE_STORE).part(path).finish();
        if let Some(bytes) = self.cache.get(&key) {
            metrics::record_request(FILE_STORE, "cache_hit", Instant::now());
            return Ok(bytes);
        }

        let response = self.client.execute(RequestSpec::get(path)).await?;
        tracing::debug!(service = FILE_STORE, path, bytes = response.body.len(), "File loaded");

        self.cache.insert(key, response.body.clone());
        Ok(response.body)
    }

    /// Forget a cached file so the next load hits the store.
    pub fn invalidate(&self, path: &str) {
        self.cache
            .remove(&Fingerprint::new(FILE_STORE).part(path.trim()).finish());
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
