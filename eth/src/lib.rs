//! # batchrpc Eth
//!
//! Batched JSON-RPC client for Ethereum-style nodes.
//!
//! [`JsonRpcProvider`] sends every call through one coalescing engine, so
//! concurrent requests from anywhere in an application share HTTP round
//! trips. Its convenience methods reshape node results into typed values:
//!
//! - quantities become `u64`/`u128`
//! - addresses are re-cased to their EIP-55 checksum form
//! - optional fields a node omits become `None`
//!
//! ## Example
//!
//! ```no_run
//! use batchrpc_eth::JsonRpcProvider;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = JsonRpcProvider::new("https://eth.llamarpc.com")?;
//! let network = provider.ready().await?;
//! println!("chain {}", network.chain_id);
//!
//! let raw = provider.api("eth_gasPrice", vec![]).await?;
//! provider.destroy().await;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod provider;
pub mod quantity;
pub mod types;

pub use address::{AddressError, to_checksum_address};
pub use batchrpc_core::{RpcError, RpcResult};
pub use batchrpc_runtime::BATCH_MAX_REQUESTS;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use provider::JsonRpcProvider;
pub use quantity::{QuantityError, to_hex};
pub use types::{
    AccessListItem, Block, BlockTag, Log, LogFilter, Network, Signature, TopicFilter, Transaction,
};
