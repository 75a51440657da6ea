//! Prometheus metrics for batch dispatch.
//!
//! Counters and histograms are recorded through the `metrics` facade, so
//! they cost nothing until a recorder is installed. [`MetricsRecorder`]
//! installs the Prometheus exporter and renders the text format.
//!
//! # Example
//!
//! ```rust,no_run
//! use batchrpc_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run a Batcher ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installs the Prometheus recorder and renders collected metrics.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe all metrics and install the Prometheus recorder globally.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// Only one recorder can be installed per process. If one already is
    /// (e.g., in tests), this logs a warning and leaves `render()` returning
    /// `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .set_buckets_for_metric(
                Matcher::Full("batchrpc_batch_size".to_string()),
                &[1.0, 2.0, 4.0, 6.0, 8.0, 16.0, 32.0, 64.0, 128.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the Prometheus handle, if this recorder installed one.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "batchrpc_requests_submitted_total",
        "Total number of calls admitted to the batch queue"
    );
    describe_counter!(
        "batchrpc_requests_rejected_total",
        "Total number of calls refused because shutdown had begun"
    );
    describe_gauge!(
        "batchrpc_queue_depth",
        "Calls waiting in the admission queue"
    );
    describe_counter!(
        "batchrpc_batches_dispatched_total",
        "Total number of batches sent to the endpoint"
    );
    describe_histogram!(
        "batchrpc_batch_size",
        "Number of calls per dispatched batch"
    );
    describe_histogram!(
        "batchrpc_dispatch_duration_seconds",
        "Time from sending a batch to delivering every outcome"
    );
    describe_counter!(
        "batchrpc_batch_failures_total",
        "Batches failed as a whole, by kind"
    );
    describe_counter!(
        "batchrpc_call_errors_total",
        "Individual calls rejected inside an otherwise successful batch, by kind"
    );
}

/// Batch engine metrics recorder.
pub struct BatchMetrics;

impl BatchMetrics {
    /// Record a call admitted to the queue.
    pub fn record_submitted(queue_depth: usize) {
        counter!("batchrpc_requests_submitted_total").increment(1);
        Self::record_queue_depth(queue_depth);
    }

    /// Record a call refused at admission.
    pub fn record_rejected() {
        counter!("batchrpc_requests_rejected_total").increment(1);
    }

    /// Record the current queue depth.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_queue_depth(depth: usize) {
        gauge!("batchrpc_queue_depth").set(depth as f64);
    }

    /// Record a completed dispatch.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_dispatch(size: usize, duration: Duration) {
        counter!("batchrpc_batches_dispatched_total").increment(1);
        histogram!("batchrpc_batch_size").record(size as f64);
        histogram!("batchrpc_dispatch_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a batch that failed as a whole.
    pub fn record_batch_failure(kind: &'static str) {
        counter!("batchrpc_batch_failures_total", "kind" => kind).increment(1);
    }

    /// Record one call rejected by a per-call error.
    pub fn record_call_error(kind: &'static str) {
        counter!("batchrpc_call_errors_total", "kind" => kind).increment(1);
    }
}
