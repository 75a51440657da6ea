//! Batching configuration.
//!
//! # Example
//!
//! ```rust
//! use batchrpc_runtime::config::BatchConfig;
//! use std::time::Duration;
//!
//! let config = BatchConfig::builder()
//!     .max_batch_size(10)
//!     .coalesce_delay(Duration::from_millis(2))
//!     .build();
//!
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default number of calls sent in one HTTP request.
pub const BATCH_MAX_REQUESTS: usize = 6;

/// Default quiet period before a flush.
pub const DEFAULT_COALESCE_DELAY: Duration = Duration::from_millis(1);

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds an unusable value
    #[error("Configuration validation failed: {0}")]
    Invalid(String),

    /// A source could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A required environment variable is missing
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),
}

/// Flush scheduling and batch sizing for a [`Batcher`](crate::Batcher).
///
/// # Default Values
///
/// - `coalesce_delay`: 1ms
/// - `max_batch_size`: [`BATCH_MAX_REQUESTS`]
/// - `max_wait`: none (pure trailing debounce)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Quiet period after the last admission before a flush starts
    #[serde(with = "duration_millis")]
    pub coalesce_delay: Duration,
    /// Maximum number of calls in one HTTP request
    pub max_batch_size: usize,
    /// Upper bound on how long the oldest queued call waits for a flush
    #[serde(with = "option_duration_millis")]
    pub max_wait: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            coalesce_delay: DEFAULT_COALESCE_DELAY,
            max_batch_size: BATCH_MAX_REQUESTS,
            max_wait: None,
        }
    }
}

impl BatchConfig {
    /// Create a new config builder.
    #[must_use]
    pub const fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            coalesce_delay: None,
            max_batch_size: None,
            max_wait: None,
        }
    }

    /// Check the config for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `max_batch_size` is zero or
    /// `max_wait` is shorter than `coalesce_delay`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid("max_batch_size must be > 0".to_string()));
        }
        if let Some(max_wait) = self.max_wait {
            if max_wait < self.coalesce_delay {
                return Err(ConfigError::Invalid(format!(
                    "max_wait ({max_wait:?}) must not be shorter than coalesce_delay ({:?})",
                    self.coalesce_delay
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug, Clone)]
pub struct BatchConfigBuilder {
    coalesce_delay: Option<Duration>,
    max_batch_size: Option<usize>,
    max_wait: Option<Duration>,
}

impl BatchConfigBuilder {
    /// Set the quiet period before a flush.
    #[must_use]
    pub const fn coalesce_delay(mut self, delay: Duration) -> Self {
        self.coalesce_delay = Some(delay);
        self
    }

    /// Set the maximum number of calls per HTTP request.
    #[must_use]
    pub const fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    /// Bound how long the oldest queued call may wait.
    #[must_use]
    pub const fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Build the [`BatchConfig`].
    #[must_use]
    pub fn build(self) -> BatchConfig {
        BatchConfig {
            coalesce_delay: self.coalesce_delay.unwrap_or(DEFAULT_COALESCE_DELAY),
            max_batch_size: self.max_batch_size.unwrap_or(BATCH_MAX_REQUESTS),
            max_wait: self.max_wait,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation, clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.coalesce_delay, Duration::from_millis(1));
        assert_eq!(config.max_batch_size, BATCH_MAX_REQUESTS);
        assert_eq!(config.max_wait, None);
        assert_eq!(BatchConfig::builder().build(), config);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = BatchConfig::builder().max_batch_size(0).build();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_delay_allowed() {
        let config = BatchConfig::builder().coalesce_delay(Duration::ZERO).build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_wait_shorter_than_delay_rejected() {
        let config = BatchConfig::builder()
            .coalesce_delay(Duration::from_millis(10))
            .max_wait(Duration::from_millis(5))
            .build();
        assert!(config.validate().is_err());

        let config = BatchConfig::builder()
            .coalesce_delay(Duration::from_millis(10))
            .max_wait(Duration::from_millis(50))
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_millis() {
        let config: BatchConfig =
            serde_json::from_str(r#"{"coalesce_delay": 5, "max_wait": 100}"#).unwrap_or_default();
        assert_eq!(config.coalesce_delay, Duration::from_millis(5));
        assert_eq!(config.max_wait, Some(Duration::from_millis(100)));
        assert_eq!(config.max_batch_size, BATCH_MAX_REQUESTS);
    }
}
