//! Per-service resilience state.
//!
//! # Responsibilities
//! - Hand out exactly one circuit breaker and one request queue per service key
//! - Create them lazily from the effective config for that key
//! - Report circuit status for every known service
//! - Stop every queue worker on shutdown
//!
//! # Design Decisions
//! - Owned object with explicit construction instead of process-global maps,
//!   so tests can build isolated registries
//! - `DashMap::entry` makes first-use creation race-free

use dashmap::DashMap;
use std::sync::Arc;

use crate::config::ShieldConfig;
use crate::lifecycle::Shutdown;
use crate::resilience::{CircuitBreaker, CircuitSnapshot, RequestQueue};

/// Registry of breakers and queues keyed by service key.
#[derive(Debug)]
pub struct ServiceRegistry {
    config: ShieldConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    queues: DashMap<String, RequestQueue>,
    shutdown: Shutdown,
}

impl ServiceRegistry {
    pub fn new(config: ShieldConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
            queues: DashMap::new(),
            shutdown: Shutdown::new(),
        }
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    /// The breaker for `service`, created on first use.
    pub fn breaker(&self, service: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(service, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(
                    service,
                    self.config.service(service).breaker,
                ))
            })
            .clone()
    }

    /// The queue for `service`, spawning its worker on first use.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn queue(&self, service: &str) -> RequestQueue {
        self.queues
            .entry(service.to_string())
            .or_insert_with(|| {
                RequestQueue::spawn(
                    service,
                    &self.config.service(service).queue,
                    self.shutdown.subscribe(),
                )
            })
            .clone()
    }

    /// Circuit snapshots for every service seen so far, sorted by key.
    pub fn statuses(&self) -> Vec<CircuitSnapshot> {
        let mut statuses: Vec<_> = self.breakers.iter().map(|b| b.value().snapshot()).collect();
        statuses.sort_by(|a, b| a.service.cmp(&b.service));
        statuses
    }

    /// Stop all queue workers. Pending operations resolve to a shutdown error.
    pub fn shutdown(&self) {
        tracing::info!(queues = self.queues.len(), "Shutting down service queues");
        self.shutdown.trigger();
    }
}
