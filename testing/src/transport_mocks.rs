//! Scripted in-memory transport
//!
//! [`MockTransport`] decodes each posted batch, records it, and answers with
//! whatever its responder closure returns. It also tracks how many `post`
//! calls overlap, so tests can check that an engine never has two batches
//! in flight.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use async_trait::async_trait;
use batchrpc_core::{Transport, TransportError, TransportResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One request entry as the mock saw it on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordedRequest {
    /// Protocol version tag
    pub jsonrpc: String,
    /// Request id
    pub id: u32,
    /// Method name
    pub method: String,
    /// Positional parameters
    pub params: Vec<Value>,
}

type Responder =
    dyn Fn(&[RecordedRequest]) -> Result<TransportResponse, TransportError> + Send + Sync;

struct Inner {
    responder: Box<Responder>,
    latency: Mutex<Option<Duration>>,
    batches: Mutex<Vec<Vec<RecordedRequest>>>,
    urls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closes: AtomicUsize,
}

/// In-memory [`Transport`] with a scripted responder.
///
/// # Example
///
/// ```
/// use batchrpc_testing::MockTransport;
/// use batchrpc_core::TransportResponse;
///
/// // Every batch fails with 429
/// let transport = MockTransport::new(|_| Ok(TransportResponse::new(429, "")));
/// assert!(transport.batches().is_empty());
/// ```
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    /// Create a mock that answers every batch with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[RecordedRequest]) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                responder: Box::new(responder),
                latency: Mutex::new(None),
                batches: Mutex::new(Vec::new()),
                urls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }),
        }
    }

    /// Mock that resolves every call with its own params array.
    #[must_use]
    pub fn echo_results() -> Self {
        Self::new(|requests| {
            let entries: Vec<Value> = requests
                .iter()
                .map(|r| json!({"jsonrpc": "2.0", "id": r.id, "result": r.params}))
                .collect();
            Ok(json_response(&entries))
        })
    }

    /// Mock that resolves every call with `result`.
    #[must_use]
    pub fn constant(result: Value) -> Self {
        Self::new(move |requests| {
            let entries: Vec<Value> = requests
                .iter()
                .map(|r| json!({"jsonrpc": "2.0", "id": r.id, "result": result}))
                .collect();
            Ok(json_response(&entries))
        })
    }

    /// Delay every response by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.inner.latency.lock().unwrap() = Some(latency);
        self
    }

    /// Every batch received so far, in arrival order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<RecordedRequest>> {
        self.inner.batches.lock().unwrap().clone()
    }

    /// Size of every batch received so far.
    #[must_use]
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.inner.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// Target URL of every post.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.inner.urls.lock().unwrap().clone()
    }

    /// Largest number of `post` calls that were in progress at once.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }
}

/// Serialize `value` into a 200 response.
#[must_use]
pub fn json_response(value: &impl serde::Serialize) -> TransportResponse {
    TransportResponse::new(200, serde_json::to_vec(value).unwrap())
}

/// Decrements the in-flight gauge on every exit path.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.inner.in_flight);

        let requests: Vec<RecordedRequest> = serde_json::from_slice(&body)
            .map_err(|e| TransportError::Connect(format!("mock could not decode batch: {e}")))?;
        self.inner.batches.lock().unwrap().push(requests.clone());
        self.inner.urls.lock().unwrap().push(url.to_string());

        let latency = *self.inner.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        (self.inner.responder)(&requests)
    }

    async fn close(&self) {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_body(ids: &[u32]) -> Vec<u8> {
        let entries: Vec<Value> = ids
            .iter()
            .map(|id| json!({"jsonrpc": "2.0", "id": id, "method": "eth_blockNumber", "params": []}))
            .collect();
        serde_json::to_vec(&entries).unwrap()
    }

    #[tokio::test]
    async fn test_records_batches() {
        let transport = MockTransport::echo_results();

        let response = transport.post("http://node", batch_body(&[1, 2])).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.batch_sizes(), vec![2]);
        assert_eq!(transport.batches()[0][1].id, 2);
        assert_eq!(transport.urls(), vec!["http://node".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracks_concurrency() {
        let transport = MockTransport::echo_results().with_latency(Duration::from_millis(10));

        let (a, b) = tokio::join!(
            transport.post("http://node", batch_body(&[1])),
            transport.post("http://node", batch_body(&[2])),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.max_concurrency(), 2);
    }

    #[tokio::test]
    async fn test_counts_closes() {
        let transport = MockTransport::constant(Value::Null);
        transport.close().await;
        assert_eq!(transport.close_count(), 1);
    }
}
