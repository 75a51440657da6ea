//! Provider construction errors

use batchrpc_http::BuildError;
use batchrpc_runtime::ConfigError;
use thiserror::Error;

/// Errors raised while building a [`JsonRpcProvider`](crate::JsonRpcProvider).
///
/// Calls made through a built provider fail with
/// [`RpcError`](batchrpc_core::RpcError) instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP transport could not be built
    #[error(transparent)]
    Transport(#[from] BuildError),
}
