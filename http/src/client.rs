//! reqwest-backed transport

use crate::config::TransportConfig;
use async_trait::async_trait;
use batchrpc_core::{CONTENT_TYPE_JSON, Transport, TransportError, TransportResponse};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::error::Error as _;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Errors raised while building the connection pools.
#[derive(Debug, Error)]
pub enum BuildError {
    /// reqwest rejected the client configuration
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// URL scheme, selecting which pool serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// Scheme of `url`, if it is one the transport can serve.
    #[must_use]
    pub fn of(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        if scheme.eq_ignore_ascii_case("https") {
            Some(Self::Https)
        } else if scheme.eq_ignore_ascii_case("http") {
            Some(Self::Http)
        } else {
            None
        }
    }
}

#[derive(Clone)]
struct Pools {
    http: Client,
    https: Client,
}

impl Pools {
    fn get(&self, scheme: Scheme) -> Client {
        match scheme {
            Scheme::Http => self.http.clone(),
            Scheme::Https => self.https.clone(),
        }
    }
}

/// HTTP transport with one keep-alive pool per scheme.
///
/// Every body is sent with `Content-Type: application/json` and every
/// response body is read to the end, error statuses included, so the
/// connection goes back to its pool. [`Transport::close`] drops both pools;
/// later posts fail with [`TransportError::Closed`].
///
/// # Example
///
/// ```no_run
/// use batchrpc_http::{HttpTransport, TransportConfig};
///
/// let transport = HttpTransport::new(&TransportConfig::default())?;
/// # Ok::<(), batchrpc_http::BuildError>(())
/// ```
pub struct HttpTransport {
    pools: RwLock<Option<Pools>>,
}

impl HttpTransport {
    /// Build both pools from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if reqwest cannot construct a client, for
    /// example when no TLS backend is available.
    pub fn new(config: &TransportConfig) -> Result<Self, BuildError> {
        let pools = Pools {
            http: build_client(config, false)?,
            https: build_client(config, true)?,
        };
        Ok(Self {
            pools: RwLock::new(Some(pools)),
        })
    }

    /// Whether [`Transport::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn client_for(&self, url: &str) -> Result<Client, TransportError> {
        let scheme = Scheme::of(url)
            .ok_or_else(|| TransportError::Connect(format!("unsupported URL scheme: {url}")))?;
        let pools = self.pools.read().unwrap_or_else(PoisonError::into_inner);
        pools
            .as_ref()
            .map(|pools| pools.get(scheme))
            .ok_or(TransportError::Closed)
    }
}

fn build_client(config: &TransportConfig, https_only: bool) -> Result<Client, BuildError> {
    Client::builder()
        .timeout(config.request_timeout())
        .pool_idle_timeout(config.pool_idle_timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .tcp_keepalive(config.tcp_keepalive())
        .https_only(https_only)
        .build()
        .map_err(|e| BuildError::Client(e.to_string()))
}

/// Map a reqwest failure onto the transport contract.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    TransportError::Connect(message)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
        let client = self.client_for(url)?;

        let response = client
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(&e))?;

        tracing::trace!(status, bytes = body.len(), "response received");

        Ok(TransportResponse { status, body })
    }

    async fn close(&self) {
        let pools = self
            .pools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if pools.is_some() {
            tracing::debug!("connection pools released");
        }
    }
}
