//! # batchrpc Runtime
//!
//! The coalescing engine for JSON-RPC over HTTP.
//!
//! Application code submits independent calls concurrently; the engine
//! merges them into size-capped batches within a short debounce window,
//! sends each batch as one HTTP request, and hands every caller its own
//! result or error.
//!
//! ## Core Components
//!
//! - **Batcher**: admission queue, debounced flush scheduling, batch
//!   slicing, draining on shutdown
//! - **Dispatcher**: one round trip per batch, response correlation by id,
//!   failure classification
//! - **BatchConfig**: debounce delay, batch size cap, optional max wait
//!
//! ## Example
//!
//! ```ignore
//! use batchrpc_runtime::{BatchConfig, Batcher};
//! use serde_json::json;
//!
//! let batcher = Batcher::new(transport, "https://eth.llamarpc.com", BatchConfig::default());
//!
//! let block = batcher.submit("eth_getBlockByNumber", vec![json!("0x1"), json!(false)])?;
//! let head = batcher.submit("eth_blockNumber", vec![])?;
//! let (block, head) = tokio::join!(block, head);
//!
//! batcher.shutdown().await;
//! ```

/// Coalescing engine
pub mod batcher;

/// Batch and scheduling configuration
pub mod config;

/// Round trips and response correlation
pub mod dispatcher;

/// Prometheus metrics for observability
pub mod metrics;

pub use batcher::Batcher;
pub use config::{BATCH_MAX_REQUESTS, BatchConfig, ConfigError};
pub use dispatcher::{DispatchSummary, Dispatcher};
