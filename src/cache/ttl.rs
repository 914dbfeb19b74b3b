//! In-memory TTL cache.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Fingerprint-keyed store of successful results.
///
/// Entries older than `ttl` are treated as absent and removed lazily on
/// lookup. When `max_entries` is set, inserting into a full cache first
/// purges expired entries, then evicts the oldest.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    service: Arc<str>,
    entries: Arc<DashMap<String, Entry<V>>>,
    ttl: Duration,
    max_entries: Option<usize>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(service: impl Into<String>, config: &CacheConfig) -> Self {
        Self {
            service: Arc::from(service.into()),
            entries: Arc::new(DashMap::new()),
            ttl: config.ttl(),
            max_entries: config.max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => None,
            None => {
                metrics::record_cache_lookup(&self.service, false);
                return None;
            }
        };

        if hit.is_none() {
            // guard dropped above; re-check so a concurrent refresh survives
            self.entries
                .remove_if(key, |_, e| now.duration_since(e.inserted_at) >= self.ttl);
            tracing::trace!(service = %self.service, "Cache entry expired");
        }
        metrics::record_cache_lookup(&self.service, hit.is_some());
        hit
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some(cap) = self.max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= cap {
                self.make_room(cap);
            }
        }
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.duration_since(e.inserted_at) < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, e)| e.value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn make_room(&self, cap: usize) {
        let purged = self.purge_expired();
        if purged > 0 {
            tracing::debug!(service = %self.service, purged, "Purged expired cache entries");
        }

        while self.entries.len() >= cap {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().inserted_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    tracing::debug!(service = %self.service, "Evicted oldest cache entry");
                }
                None => break,
            }
        }
    }
}
