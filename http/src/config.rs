//! HTTP transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection pool and timeout settings for [`HttpTransport`](crate::HttpTransport).
///
/// # Default Values
///
/// - `request_timeout`: 30 seconds
/// - `pool_idle_timeout`: 30 seconds
/// - `tcp_keepalive`: 30 seconds
/// - `pool_max_idle_per_host`: 16
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Total time allowed for one round trip, body included
    pub request_timeout_secs: u64,
    /// How long an idle pooled connection is kept
    pub pool_idle_timeout_secs: u64,
    /// TCP keep-alive probe interval
    pub tcp_keepalive_secs: u64,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            pool_idle_timeout_secs: 30,
            tcp_keepalive_secs: 30,
            pool_max_idle_per_host: 16,
        }
    }
}

impl TransportConfig {
    /// Request timeout as Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pool idle timeout as Duration
    #[must_use]
    pub const fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }

    /// Keep-alive interval as Duration
    #[must_use]
    pub const fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }
}
