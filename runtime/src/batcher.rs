//! The coalescing engine.
//!
//! Calls are admitted into a FIFO queue by [`Batcher::submit`]. A single
//! worker task owns flushing and moves between two states:
//!
//! - **Idle**: waiting for an admission (or shutdown) to wake it, then
//!   waiting out the debounce window. Every admission pushes the flush
//!   deadline to `now + coalesce_delay`.
//! - **Flushing**: taking up to `max_batch_size` envelopes from the head of
//!   the queue and dispatching them, looping until the queue is empty.
//!   Calls admitted while a batch is in flight go out right after it,
//!   without a new debounce window.
//!
//! Because only the worker dispatches, at most one batch is in flight per
//! engine.

use crate::config::BatchConfig;
use crate::dispatcher::Dispatcher;
use crate::metrics::BatchMetrics;
use batchrpc_core::{Envelope, IdGenerator, ResponseHandle, RpcError, RpcResult, Transport};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Stand-in for deadlines too far out for `Instant` to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(start: Instant, wait: Duration) -> Instant {
    start
        .checked_add(wait)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Mutable admission state, guarded by one lock.
struct Admission {
    ids: IdGenerator,
    queue: VecDeque<Envelope>,
    /// Trailing debounce deadline, set by the latest admission
    deadline: Option<Instant>,
    /// Admission time of the oldest call still queued
    oldest: Option<Instant>,
    draining: bool,
}

impl Admission {
    /// When the idle worker should start flushing, or `None` if there is
    /// nothing to flush.
    fn flush_at(&self, config: &BatchConfig) -> Option<Instant> {
        if self.queue.is_empty() {
            return None;
        }
        let deadline = self.deadline?;
        match (config.max_wait, self.oldest) {
            (Some(max_wait), Some(oldest)) => Some(deadline.min(deadline_after(oldest, max_wait))),
            _ => Some(deadline),
        }
    }

    fn take_batch(&mut self, max: usize) -> Option<Vec<Envelope>> {
        if self.queue.is_empty() {
            return None;
        }
        let count = max.max(1).min(self.queue.len());
        let batch: Vec<Envelope> = self.queue.drain(..count).collect();
        if self.queue.is_empty() {
            self.deadline = None;
            self.oldest = None;
        }
        Some(batch)
    }
}

struct Shared<T> {
    dispatcher: Dispatcher<T>,
    config: BatchConfig,
    admission: Mutex<Admission>,
    wake: Notify,
}

impl<T: Transport> Shared<T> {
    fn admission(&self) -> MutexGuard<'_, Admission> {
        // Admission holds no invariant a panicking holder could break halfway
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self: Arc<Self>) {
        debug!(url = self.dispatcher.url(), "Batch worker started");
        loop {
            // Idle until something is admitted or shutdown begins
            self.wake.notified().await;
            self.debounce().await;
            self.drain().await;

            if self.admission().draining {
                break;
            }
        }
        debug!(url = self.dispatcher.url(), "Batch worker stopped");
    }

    /// Wait until the flush deadline passes, following it as admissions
    /// push it back. Returns early once shutdown begins.
    async fn debounce(&self) {
        loop {
            let flush_at = {
                let admission = self.admission();
                if admission.draining {
                    return;
                }
                admission.flush_at(&self.config)
            };
            let Some(flush_at) = flush_at else {
                return;
            };
            if Instant::now() >= flush_at {
                return;
            }
            tokio::select! {
                () = sleep_until(flush_at) => {}
                () = self.wake.notified() => {}
            }
        }
    }

    /// Dispatch batches until the queue is empty.
    async fn drain(&self) {
        loop {
            let batch = {
                let mut admission = self.admission();
                let batch = admission.take_batch(self.config.max_batch_size);
                BatchMetrics::record_queue_depth(admission.queue.len());
                batch
            };
            let Some(batch) = batch else {
                return;
            };
            self.dispatcher.dispatch(batch).await;
        }
    }
}

/// Coalesces concurrent calls into size-capped JSON-RPC batches.
///
/// # Example
///
/// ```rust,ignore
/// use batchrpc_runtime::{BatchConfig, Batcher};
///
/// let batcher = Batcher::new(transport, "https://eth.llamarpc.com", BatchConfig::default());
///
/// let a = batcher.submit("eth_blockNumber", vec![])?;
/// let b = batcher.submit("eth_chainId", vec![])?;
/// // Both calls travel in one HTTP request
/// let (a, b) = tokio::join!(a, b);
///
/// batcher.shutdown().await;
/// ```
pub struct Batcher<T: Transport> {
    shared: Arc<Shared<T>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport> Batcher<T> {
    /// Create an engine for `url` and start its worker task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(transport: T, url: impl Into<String>, config: BatchConfig) -> Self {
        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(transport, url),
            config,
            admission: Mutex::new(Admission {
                ids: IdGenerator::new(),
                queue: VecDeque::new(),
                deadline: None,
                oldest: None,
                draining: false,
            }),
            wake: Notify::new(),
        });

        let worker = tokio::spawn(Arc::clone(&shared).run());

        Self {
            shared,
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    /// Admit a call and return the handle its outcome arrives on.
    ///
    /// Re-arms the flush deadline. The call is sent in the next batch with
    /// room for it.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ShutdownInProgress`] once shutdown has begun; the
    /// call is not queued.
    pub fn submit(&self, method: impl Into<String>, params: Vec<Value>) -> Result<ResponseHandle, RpcError> {
        let method = method.into();
        let (id, depth, handle) = {
            let mut admission = self.shared.admission();
            if admission.draining {
                drop(admission);
                BatchMetrics::record_rejected();
                debug!(%method, "Rejected call submitted after shutdown");
                return Err(RpcError::ShutdownInProgress);
            }

            let id = admission.ids.next_id();
            let now = Instant::now();
            let (envelope, handle) = Envelope::new(id, method.as_str(), params);
            admission.queue.push_back(envelope);
            admission.deadline = Some(deadline_after(now, self.shared.config.coalesce_delay));
            admission.oldest.get_or_insert(now);
            (id, admission.queue.len(), handle)
        };

        self.shared.wake.notify_one();
        BatchMetrics::record_submitted(depth);
        debug!(id, %method, queue_depth = depth, "Call admitted");

        Ok(handle)
    }

    /// Submit a call and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Returns whatever error the call's batch or entry produced, or
    /// [`RpcError::ShutdownInProgress`] if shutdown has begun.
    pub async fn call(&self, method: impl Into<String>, params: Vec<Value>) -> RpcResult {
        self.submit(method, params)?.await
    }

    /// Stop admitting calls, flush everything queued, and close the
    /// transport.
    ///
    /// Returns once every call admitted before shutdown began has its
    /// outcome. A second call waits for the first to finish and then
    /// returns without doing anything.
    pub async fn shutdown(&self) {
        let mut worker = self.worker.lock().await;
        let Some(handle) = worker.take() else {
            return;
        };

        let pending = {
            let mut admission = self.shared.admission();
            admission.draining = true;
            admission.queue.len()
        };
        info!(url = self.shared.dispatcher.url(), pending, "Shutting down batcher");
        self.shared.wake.notify_one();

        if let Err(e) = handle.await {
            warn!(error = %e, "Batch worker ended abnormally");
        }

        // Only reachable with leftovers if the worker died; their handles
        // resolve to `Canceled` when dropped
        let leftovers = std::mem::take(&mut self.shared.admission().queue);
        if !leftovers.is_empty() {
            warn!(count = leftovers.len(), "Dropping calls the worker never sent");
        }
        drop(leftovers);

        self.shared.dispatcher.transport().close().await;
        info!(url = self.shared.dispatcher.url(), "Batcher shut down");
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.admission().draining
    }

    /// Number of calls waiting to be sent.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.admission().queue.len()
    }

    /// Target endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        self.shared.dispatcher.url()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.shared.config
    }

    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        self.shared.dispatcher.transport()
    }
}

impl<T: Transport> Drop for Batcher<T> {
    fn drop(&mut self) {
        // Let the worker flush what is queued and exit on its own
        self.shared.admission().draining = true;
        self.shared.wake.notify_one();
    }
}
