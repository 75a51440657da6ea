//! Transport contract consumed by the dispatcher.
//!
//! A transport performs one `POST` of a JSON body and reports the status
//! and body of the response. Implementations own their connection pools and
//! release them in [`Transport::close`].

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;

/// Content type sent with every request body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Status and body of one HTTP round trip.
///
/// The body has been read to completion by the transport, so the underlying
/// connection is already released whether or not anyone decodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// HTTP transport used to deliver batches.
///
/// # Thread Safety
///
/// One transport is shared by every dispatch of an engine, so
/// implementations must be `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// `POST` `body` to `url` with `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP status could be obtained.
    /// Error statuses are not errors at this layer.
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError>;

    /// Release pooled connections. Called once, when the engine shuts down.
    async fn close(&self) {}
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
        (**self).post(url, body).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
