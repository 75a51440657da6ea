//! Error taxonomy for batched JSON-RPC calls.
//!
//! Errors fall in two groups:
//!
//! - **Batch-level** ([`RpcError::Transport`], [`RpcError::Timeout`],
//!   [`RpcError::Http`], [`RpcError::MalformedResponse`]): the whole round
//!   trip failed, so the same error is delivered to every call in the batch.
//! - **Per-call** ([`RpcError::Rpc`], [`RpcError::MissingResponse`]): only
//!   the call whose id it names is affected.
//!
//! [`RpcError`] is `Clone` so one batch-level failure can be handed to every
//! waiting caller.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Named classification of an HTTP error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// 403 from the node endpoint
    Forbidden,
    /// 429 from the node endpoint
    RateLimited,
    /// Any other 4xx or 5xx status
    Server,
}

impl HttpErrorKind {
    /// Classify an HTTP status.
    ///
    /// Returns `None` for statuses outside the 400..=599 error range.
    #[must_use]
    pub const fn classify(status: u16) -> Option<Self> {
        match status {
            403 => Some(Self::Forbidden),
            429 => Some(Self::RateLimited),
            400..=599 => Some(Self::Server),
            _ => None,
        }
    }

    /// Short label used in metrics and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::Server => "server_error",
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden => write!(f, "Forbidden"),
            Self::RateLimited => write!(f, "Rate limit"),
            Self::Server => write!(f, "Server error"),
        }
    }
}

/// Errors a caller can observe for a submitted call.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Connectivity failure before any HTTP status was received
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Target endpoint
        url: String,
        /// Underlying connection error
        message: String,
    },

    /// The batch body could not be serialized
    #[error("Failed to encode batch for {url}: {message}")]
    Encode {
        /// Target endpoint
        url: String,
        /// Serializer error
        message: String,
    },

    /// The transport gave up waiting for the endpoint
    #[error("Request to {url} timed out")]
    Timeout {
        /// Target endpoint
        url: String,
    },

    /// The endpoint answered with an error status
    #[error("{kind} ({status})")]
    Http {
        /// HTTP status code
        status: u16,
        /// Target endpoint
        url: String,
        /// Named classification of `status`
        kind: HttpErrorKind,
    },

    /// Success status, but the body is not a usable response array
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse {
        /// Target endpoint
        url: String,
        /// What was wrong with the body
        reason: String,
    },

    /// The endpoint returned an error object for this call
    #[error("{message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
        /// Optional error data
        data: Option<Value>,
        /// Method of the failed call
        method: String,
        /// Params of the failed call
        params: Vec<Value>,
        /// Target endpoint
        url: String,
    },

    /// The endpoint dropped this id from its response array
    #[error("Missing response for request ({id})")]
    MissingResponse {
        /// Id that had no matching entry
        id: u32,
    },

    /// Submitted after shutdown began
    #[error("Provider is destroyed")]
    ShutdownInProgress,

    /// The outcome slot was dropped without a value
    #[error("Request was canceled before completion")]
    Canceled,

    /// A result could not be reshaped into the expected type
    #[error("Failed to decode result of {method}: {message}")]
    Decode {
        /// Method whose result failed to decode
        method: String,
        /// Decoder error
        message: String,
    },
}

impl RpcError {
    /// HTTP status for [`RpcError::Http`] errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// JSON-RPC error code for [`RpcError::Rpc`] errors.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error was broadcast to a whole batch.
    #[must_use]
    pub const fn is_batch_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Encode { .. }
                | Self::Timeout { .. }
                | Self::Http { .. }
                | Self::MalformedResponse { .. }
        )
    }

    /// Short label used in metrics and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Encode { .. } => "encode",
            Self::Timeout { .. } => "timeout",
            Self::Http { kind, .. } => kind.as_str(),
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Rpc { .. } => "rpc",
            Self::MissingResponse { .. } => "missing_response",
            Self::ShutdownInProgress => "shutdown",
            Self::Canceled => "canceled",
            Self::Decode { .. } => "decode",
        }
    }

    /// Build the batch-level error for an HTTP error status.
    ///
    /// Returns `None` when `status` is not in the error range.
    #[must_use]
    pub fn from_status(status: u16, url: &str) -> Option<Self> {
        HttpErrorKind::classify(status).map(|kind| Self::Http {
            status,
            url: url.to_string(),
            kind,
        })
    }
}

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not connect, send, or read the response
    #[error("connection error: {0}")]
    Connect(String),

    /// Connection-level timeout elapsed
    #[error("timed out")]
    Timeout,

    /// The transport was closed and holds no connection pools
    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Attach the target endpoint, producing the caller-visible error.
    #[must_use]
    pub fn into_rpc_error(self, url: &str) -> RpcError {
        match self {
            Self::Timeout => RpcError::Timeout {
                url: url.to_string(),
            },
            other => RpcError::Transport {
                url: url.to_string(),
                message: other.to_string(),
            },
        }
    }
}
