//! # batchrpc HTTP
//!
//! [`Transport`](batchrpc_core::Transport) implementation over reqwest.
//!
//! [`HttpTransport`] keeps one keep-alive connection pool per URL scheme,
//! posts JSON bodies, and reads every response body to completion. Status
//! classification is left to the dispatcher.
//!
//! ## Example
//!
//! ```ignore
//! use batchrpc_http::{HttpTransport, TransportConfig};
//! use batchrpc_runtime::{BatchConfig, Batcher};
//!
//! let transport = HttpTransport::new(&TransportConfig::default())?;
//! let batcher = Batcher::new(transport, "https://eth.llamarpc.com", BatchConfig::default());
//!
//! let head = batcher.call("eth_blockNumber", vec![]).await?;
//! ```

/// reqwest-backed transport
pub mod client;

/// Pool and timeout settings
pub mod config;

pub use client::{BuildError, HttpTransport, Scheme};
pub use config::TransportConfig;
