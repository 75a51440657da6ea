//! # batchrpc Testing
//!
//! Testing utilities for the batchrpc engine.
//!
//! This crate provides:
//! - [`MockTransport`]: scripted responses, recorded batches, concurrency
//!   tracking
//! - [`init_test_tracing`]: one-time `tracing` subscriber for test output
//!
//! ## Example
//!
//! ```ignore
//! use batchrpc_runtime::{BatchConfig, Batcher};
//! use batchrpc_testing::MockTransport;
//!
//! #[tokio::test]
//! async fn test_two_calls_share_a_batch() {
//!     let transport = MockTransport::echo_results();
//!     let batcher = Batcher::new(transport.clone(), "http://node", BatchConfig::default());
//!
//!     let a = batcher.submit("eth_blockNumber", vec![]).unwrap();
//!     let b = batcher.submit("eth_chainId", vec![]).unwrap();
//!     let _ = tokio::join!(a, b);
//!
//!     assert_eq!(transport.batch_sizes(), vec![2]);
//! }
//! ```

pub mod transport_mocks;

pub use transport_mocks::{MockTransport, RecordedRequest, json_response};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
/// Output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_test_tracing();
        init_test_tracing();
    }
}
