//! Batched JSON-RPC provider

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::quantity::parse_u64;
use crate::types::{Block, BlockTag, Log, LogFilter, Network, RawBlock};
use batchrpc_core::{RpcError, RpcResult};
use batchrpc_http::HttpTransport;
use batchrpc_runtime::{BatchConfig, Batcher};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Client for one node endpoint.
///
/// Every method submits its calls to a shared [`Batcher`], so calls made
/// concurrently from many tasks travel together in size-capped batches.
///
/// # Example
///
/// ```no_run
/// use batchrpc_eth::{JsonRpcProvider, LogFilter};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = JsonRpcProvider::new("https://eth.llamarpc.com")?;
///
/// let filter = LogFilter::range(20_455_000_u64, 20_455_000_u64);
///
/// // One HTTP request carries all three calls
/// let (block, logs, head) = tokio::join!(
///     provider.get_block(20_455_000_u64, true),
///     provider.get_logs(&filter),
///     provider.get_block_number(),
/// );
///
/// provider.destroy().await;
/// # Ok(())
/// # }
/// ```
pub struct JsonRpcProvider {
    batcher: Batcher<HttpTransport>,
    network: RwLock<Option<Network>>,
}

impl JsonRpcProvider {
    /// Provider for `url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the URL is not http(s) or the transport
    /// cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(url: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(ProviderConfig::new(url))
    }

    /// Provider built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if `config` fails validation or the
    /// transport cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_config(config: ProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self {
            batcher: Batcher::new(transport, config.url, config.batch),
            network: RwLock::new(None),
        })
    }

    /// Target endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        self.batcher.url()
    }

    /// Active batching configuration.
    #[must_use]
    pub fn batch_config(&self) -> &BatchConfig {
        self.batcher.config()
    }

    /// Network identity cached by [`ready`](Self::ready).
    #[must_use]
    pub fn network(&self) -> Option<Network> {
        *self.network.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send one call and return its raw result.
    ///
    /// # Errors
    ///
    /// Returns the [`RpcError`] of the call's batch or entry.
    pub async fn api(&self, method: &str, params: Vec<Value>) -> RpcResult {
        self.batcher.call(method, params).await
    }

    /// Send one call and decode its result into `T`.
    ///
    /// # Errors
    ///
    /// Returns the [`RpcError`] of the call, or [`RpcError::Decode`] if the
    /// result does not fit `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let value = self.api(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch and cache the network identity.
    ///
    /// # Errors
    ///
    /// Same as [`get_network`](Self::get_network).
    pub async fn ready(&self) -> Result<Network, RpcError> {
        let network = self.get_network().await?;
        *self.network.write().unwrap_or_else(PoisonError::into_inner) = Some(network);
        info!(
            url = self.url(),
            network_id = network.network_id,
            chain_id = network.chain_id,
            "Provider ready"
        );
        Ok(network)
    }

    /// `net_version` and `eth_chainId`, sent in the same batch.
    ///
    /// # Errors
    ///
    /// Returns the first call's error, or [`RpcError::Decode`] if either
    /// result is not a quantity.
    pub async fn get_network(&self) -> Result<Network, RpcError> {
        let (network_id, chain_id) = tokio::join!(
            self.quantity("net_version", vec![]),
            self.quantity("eth_chainId", vec![]),
        );
        Ok(Network {
            network_id: network_id?,
            chain_id: chain_id?,
        })
    }

    /// Current head height.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or [`RpcError::Decode`] if the result is
    /// not a quantity.
    pub async fn get_block_number(&self) -> Result<u64, RpcError> {
        self.quantity("eth_blockNumber", vec![]).await
    }

    /// Block at `tag`, or `None` if the node does not have it.
    ///
    /// With `prefetch_txs`, the node returns full transactions; they land
    /// in [`Block::prefetched_transactions`] and [`Block::transactions`]
    /// keeps their hashes.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or [`RpcError::Decode`] if the block
    /// cannot be reshaped.
    pub async fn get_block(
        &self,
        tag: impl Into<BlockTag>,
        prefetch_txs: bool,
    ) -> Result<Option<Block>, RpcError> {
        let tag = tag.into();
        let raw: Option<RawBlock> = self
            .call("eth_getBlockByNumber", vec![json!(tag.to_param()), json!(prefetch_txs)])
            .await?;
        Ok(raw.map(|raw| raw.into_block(prefetch_txs)))
    }

    /// Logs matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or [`RpcError::Decode`] if a log cannot be
    /// reshaped.
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        self.call("eth_getLogs", vec![filter.to_param()]).await
    }

    /// Flush pending calls, then release the connection pools.
    ///
    /// Later calls fail with [`RpcError::ShutdownInProgress`]. Calling it
    /// again does nothing.
    pub async fn destroy(&self) {
        self.batcher.shutdown().await;
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.batcher.is_shutting_down()
    }

    /// A quantity result, as a hex or decimal string or a bare number.
    async fn quantity(&self, method: &str, params: Vec<Value>) -> Result<u64, RpcError> {
        let value = self.api(method, params).await?;
        let parsed = match &value {
            Value::String(text) => parse_u64(text).ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        };
        parsed.ok_or_else(|| RpcError::Decode {
            method: method.to_string(),
            message: format!("expected a quantity, got {value}"),
        })
    }
}
