//! Provider configuration
//!
//! A [`ProviderConfig`] bundles the endpoint URL with the batching and
//! transport settings. It can be built in code, read from `BATCHRPC_*`
//! environment variables, or parsed from TOML.
//!
//! # Example
//!
//! ```no_run
//! use batchrpc_eth::ProviderConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads BATCHRPC_URL plus optional overrides
//! let config = ProviderConfig::from_env()?;
//!
//! // Or from a file
//! let config = ProviderConfig::from_toml_str(r#"
//!     url = "https://eth.llamarpc.com"
//!
//!     [batch]
//!     max_batch_size = 10
//! "#)?;
//! # Ok(())
//! # }
//! ```

use batchrpc_http::TransportConfig;
use batchrpc_runtime::{BatchConfig, ConfigError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Endpoint URL (required)
pub const URL_VAR: &str = "BATCHRPC_URL";
/// Batch size cap
pub const BATCH_MAX_REQUESTS_VAR: &str = "BATCHRPC_BATCH_MAX_REQUESTS";
/// Debounce delay in milliseconds
pub const COALESCE_MS_VAR: &str = "BATCHRPC_COALESCE_MS";
/// Flush ceiling in milliseconds
pub const MAX_WAIT_MS_VAR: &str = "BATCHRPC_MAX_WAIT_MS";
/// Request timeout in seconds
pub const TIMEOUT_SECS_VAR: &str = "BATCHRPC_TIMEOUT_SECS";

/// Everything needed to build a [`JsonRpcProvider`](crate::JsonRpcProvider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Node endpoint, `http://` or `https://`
    pub url: String,
    /// Flush scheduling and batch sizing
    #[serde(default)]
    pub batch: BatchConfig,
    /// Connection pools and timeouts
    #[serde(default)]
    pub transport: TransportConfig,
}

impl ProviderConfig {
    /// Default settings for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            batch: BatchConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvVarNotSet`] if `BATCHRPC_URL` is missing,
    /// [`ConfigError::Parse`] for a malformed number, and
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup, with the same keys as [`from_env`](Self::from_env).
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR).ok_or_else(|| ConfigError::EnvVarNotSet(URL_VAR.to_string()))?;
        let mut config = Self::new(url);

        if let Some(size) = parse_var::<usize>(&lookup, BATCH_MAX_REQUESTS_VAR)? {
            config.batch.max_batch_size = size;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, COALESCE_MS_VAR)? {
            config.batch.coalesce_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, MAX_WAIT_MS_VAR)? {
            config.batch.max_wait = Some(Duration::from_millis(ms));
        }
        if let Some(secs) = parse_var::<u64>(&lookup, TIMEOUT_SECS_VAR)? {
            config.transport.request_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML and
    /// [`ConfigError::Invalid`] if the result fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the URL scheme, batch settings, and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "url must start with http:// or https://, got {:?}",
                self.url
            )));
        }
        if self.transport.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".to_string()));
        }
        self.batch.validate()
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::Parse(format!("{key}: not a number: {raw:?}")))
        })
        .transpose()
}
