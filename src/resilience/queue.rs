//! Rate-limited request queue.
//!
//! # Responsibilities
//! - Run a service's outbound operations one at a time, FIFO
//! - Keep at least `min_spacing` between one operation settling and the next starting
//! - Deliver each operation's result only to the caller that enqueued it
//!
//! # Design Decisions
//! - One worker task per service key owns the receiving end of an mpsc channel;
//!   the worker's lifetime *is* the drain loop, so there is no "draining" flag
//! - A failing or panicking operation never stops the worker; a panic is
//!   reported to its caller as `QueueError::Panicked`
//! - Abandoned callers are tolerated: the result is simply dropped
//! - Workers exit on the shutdown broadcast; queued operations then resolve
//!   to `QueueError::Closed`

use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::observability::metrics;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Handle to a service's queue. Cheap to clone; all clones feed the same worker.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    service: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
    min_spacing: Duration,
}

impl RequestQueue {
    /// Spawn the worker for `service`. Must be called inside a Tokio runtime.
    pub fn spawn(
        service: impl Into<String>,
        config: &QueueConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let service: Arc<str> = Arc::from(service.into());
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));

        let worker = QueueWorker {
            service: service.clone(),
            depth: depth.clone(),
            min_spacing: config.min_spacing(),
        };
        tokio::spawn(worker.run(rx, shutdown));

        tracing::debug!(service = %service, min_spacing = ?config.min_spacing(), "Request queue started");

        Self {
            service,
            tx,
            depth,
            min_spacing: config.min_spacing(),
        }
    }

    /// Queue `operation` and wait for its output.
    pub async fn enqueue<F, Fut, T>(&self, operation: F) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let service = self.service.clone();
        let job: Job = Box::new(move || {
            async move {
                let output = AssertUnwindSafe(async move { operation().await })
                    .catch_unwind()
                    .await
                    .map_err(|_| {
                        tracing::error!(service = %service, "Queued operation panicked");
                        QueueError::Panicked
                    });
                // receiver gone means the caller stopped waiting
                let _ = result_tx.send(output);
            }
            .boxed()
        });

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(job).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }
        metrics::record_queue_depth(&self.service, depth);

        result_rx.await.map_err(|_| QueueError::Closed)?
    }

    /// Operations waiting or running.
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

struct QueueWorker {
    service: Arc<str>,
    depth: Arc<AtomicUsize>,
    min_spacing: Duration,
}

impl QueueWorker {
    async fn run(self, mut jobs: mpsc::UnboundedReceiver<Job>, mut shutdown: broadcast::Receiver<()>) {
        let mut last_settled: Option<Instant> = None;

        loop {
            let job = tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
                _ = triggered(&mut shutdown) => break,
            };

            if let Some(settled) = last_settled {
                tokio::select! {
                    _ = sleep_until(settled + self.min_spacing) => {}
                    _ = triggered(&mut shutdown) => break,
                }
            }

            tracing::trace!(service = %self.service, pending = self.depth.load(Ordering::SeqCst), "Starting queued operation");
            job().await;
            last_settled = Some(Instant::now());

            let depth = self.depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
            metrics::record_queue_depth(&self.service, depth);
        }

        jobs.close();
        self.depth.store(0, Ordering::SeqCst);
        metrics::record_queue_depth(&self.service, 0);
        tracing::info!(service = %self.service, "Request queue worker stopped");
    }
}

/// Resolves once shutdown is triggered. A dropped coordinator never triggers.
async fn triggered(shutdown: &mut broadcast::Receiver<()>) {
    if let Err(broadcast::error::RecvError::Closed) = shutdown.recv().await {
        std::future::pending::<()>().await;
    }
}
