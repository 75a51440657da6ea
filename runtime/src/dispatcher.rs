//! Batch dispatch and response demultiplexing.
//!
//! One [`Dispatcher::dispatch`] call is one HTTP round trip. Every envelope
//! handed in receives exactly one outcome before the call returns.

use crate::metrics::BatchMetrics;
use batchrpc_core::{
    CorrelationMap, Envelope, ResponseEntry, RpcError, Transport,
    wire::{WireError, encode_batch},
};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Tally of one dispatch, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Envelopes in the batch
    pub batch_size: usize,
    /// Envelopes resolved with a result
    pub resolved: usize,
    /// Envelopes rejected with a per-call or batch-level error
    pub rejected: usize,
    /// Whether the whole batch failed together
    pub batch_failed: bool,
}

/// Sends batches to one endpoint and correlates the responses.
pub struct Dispatcher<T> {
    transport: T,
    url: String,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher for `url`.
    pub fn new(transport: T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    /// Target endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `batch` in one request and deliver every envelope's outcome.
    ///
    /// Transport failures, HTTP error statuses, and undecodable bodies
    /// reject the whole batch with one shared error. Otherwise each
    /// envelope gets its own result, its own protocol error, or
    /// [`RpcError::MissingResponse`] if its id was absent.
    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(url = %self.url, batch_size = batch.len())
    )]
    pub async fn dispatch(&self, batch: Vec<Envelope>) -> DispatchSummary {
        let started = Instant::now();
        let batch_size = batch.len();

        if batch.is_empty() {
            return DispatchSummary::default();
        }

        let first_id = batch[0].id();
        trace!(
            calls = ?batch.iter().map(|e| (e.id(), e.method())).collect::<Vec<_>>(),
            "Sending batch"
        );

        let summary = match self.round_trip(&batch).await {
            Ok(responses) => self.correlate(batch, responses),
            Err(error) => fail_batch(batch, &error),
        };

        BatchMetrics::record_dispatch(batch_size, started.elapsed());
        debug!(
            first_id,
            resolved = summary.resolved,
            rejected = summary.rejected,
            batch_failed = summary.batch_failed,
            elapsed_ms = started.elapsed().as_millis(),
            "Batch dispatched"
        );

        summary
    }

    async fn round_trip(&self, batch: &[Envelope]) -> Result<CorrelationMap, RpcError> {
        let body = encode_batch(batch).map_err(|e| RpcError::Encode {
            url: self.url.clone(),
            message: e.to_string(),
        })?;

        let response = self
            .transport
            .post(&self.url, body)
            .await
            .map_err(|e| e.into_rpc_error(&self.url))?;

        if let Some(error) = RpcError::from_status(response.status, &self.url) {
            return Err(error);
        }

        let decoded: Value = serde_json::from_slice(&response.body).map_err(|e| {
            RpcError::MalformedResponse {
                url: self.url.clone(),
                reason: WireError::InvalidJson(e.to_string()).to_string(),
            }
        })?;
        trace!(response = %decoded, "Decoded response batch");

        CorrelationMap::from_value(decoded).map_err(|e| RpcError::MalformedResponse {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }

    fn correlate(&self, batch: Vec<Envelope>, mut responses: CorrelationMap) -> DispatchSummary {
        let mut summary = DispatchSummary {
            batch_size: batch.len(),
            ..DispatchSummary::default()
        };

        for envelope in batch {
            let id = envelope.id();
            match responses.take(id) {
                Some(ResponseEntry::Result(value)) => {
                    envelope.resolve(value);
                    summary.resolved += 1;
                }
                Some(ResponseEntry::Error(error)) => {
                    let (_, method, params, outcome) = envelope.into_parts();
                    debug!(id, %method, code = error.code, message = %error.message, "Call failed");
                    let error = RpcError::Rpc {
                        code: error.code,
                        message: error.message,
                        data: error.data,
                        method,
                        params,
                        url: self.url.clone(),
                    };
                    BatchMetrics::record_call_error(error.kind());
                    outcome.reject(error);
                    summary.rejected += 1;
                }
                None => {
                    warn!(id, method = envelope.method(), "Endpoint dropped a call from the batch");
                    BatchMetrics::record_call_error("missing_response");
                    envelope.reject(RpcError::MissingResponse { id });
                    summary.rejected += 1;
                }
            }
        }

        summary
    }
}

fn fail_batch(batch: Vec<Envelope>, error: &RpcError) -> DispatchSummary {
    warn!(error = %error, kind = error.kind(), batch_size = batch.len(), "Batch failed");
    BatchMetrics::record_batch_failure(error.kind());

    let batch_size = batch.len();
    for envelope in batch {
        envelope.reject(error.clone());
    }

    DispatchSummary {
        batch_size,
        resolved: 0,
        rejected: batch_size,
        batch_failed: true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use batchrpc_core::{HttpErrorKind, TransportError, TransportResponse};
    use batchrpc_testing::MockTransport;
    use serde_json::json;

    const URL: &str = "http://node.test";

    fn envelopes(methods: &[&str]) -> (Vec<Envelope>, Vec<batchrpc_core::ResponseHandle>) {
        methods
            .iter()
            .enumerate()
            .map(|(i, m)| Envelope::new(u32::try_from(i + 1).unwrap(), *m, vec![json!(i)]))
            .unzip()
    }

    #[tokio::test]
    async fn test_resolves_each_call_by_id() {
        let transport = MockTransport::echo_results();
        let dispatcher = Dispatcher::new(transport.clone(), URL);
        let (batch, handles) = envelopes(&["a", "b", "c"]);

        let summary = dispatcher.dispatch(batch).await;

        assert_eq!(summary.resolved, 3);
        assert!(!summary.batch_failed);
        for (i, handle) in handles.into_iter().enumerate() {
            // echo_results answers each call with its own params
            assert_eq!(handle.await.unwrap(), json!([i]));
        }
        assert_eq!(transport.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_error_entry_rejects_only_that_call() {
        let transport = MockTransport::new(|requests| {
            let entries: Vec<_> = requests
                .iter()
                .map(|r| {
                    if r.method == "bad" {
                        json!({"id": r.id, "error": {"code": -32000, "message": "boom", "data": "0xdead"}})
                    } else {
                        json!({"id": r.id, "result": "ok"})
                    }
                })
                .collect();
            Ok(TransportResponse::new(200, serde_json::to_vec(&entries).unwrap()))
        });
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, mut handles) = envelopes(&["good", "bad", "good"]);

        let summary = dispatcher.dispatch(batch).await;
        assert_eq!((summary.resolved, summary.rejected), (2, 1));

        let third = handles.pop().unwrap().await;
        let second = handles.pop().unwrap().await;
        let first = handles.pop().unwrap().await;

        assert_eq!(first.unwrap(), json!("ok"));
        assert_eq!(third.unwrap(), json!("ok"));
        match second {
            Err(RpcError::Rpc { code, message, data, method, params, url }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "boom");
                assert_eq!(data, Some(json!("0xdead")));
                assert_eq!(method, "bad");
                assert_eq!(params, vec![json!(1)]);
                assert_eq!(url, URL);
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_string_error_rejects_only_that_call() {
        let transport = MockTransport::new(|_| {
            Ok(TransportResponse::new(
                200,
                r#"[{"id": 1, "result": "ok"}, {"id": 2, "error": "rate limited"}]"#,
            ))
        });
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, handles) = envelopes(&["a", "b"]);

        let summary = dispatcher.dispatch(batch).await;
        assert!(!summary.batch_failed);
        assert_eq!((summary.resolved, summary.rejected), (1, 1));

        let results: Vec<_> = futures::future::join_all(handles).await;
        assert_eq!(results[0].as_ref().unwrap(), &json!("ok"));
        match &results[1] {
            Err(RpcError::Rpc { code, message, data, method, .. }) => {
                assert_eq!(*code, 0);
                assert_eq!(message, "rate limited");
                assert_eq!(data, &Some(json!("rate limited")));
                assert_eq!(method, "b");
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_id_rejects_only_that_call() {
        let transport = MockTransport::new(|requests| {
            let entries: Vec<_> = requests
                .iter()
                .filter(|r| r.id != 2)
                .map(|r| json!({"id": r.id, "result": r.id}))
                .collect();
            Ok(TransportResponse::new(200, serde_json::to_vec(&entries).unwrap()))
        });
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, handles) = envelopes(&["a", "b", "c"]);

        dispatcher.dispatch(batch).await;

        let results: Vec<_> = futures::future::join_all(handles).await;
        assert_eq!(results[0].as_ref().unwrap(), &json!(1));
        assert!(matches!(results[1], Err(RpcError::MissingResponse { id: 2 })));
        assert_eq!(results[2].as_ref().unwrap(), &json!(3));
    }

    #[tokio::test]
    async fn test_http_status_fails_whole_batch() {
        let transport = MockTransport::new(|_| Ok(TransportResponse::new(429, "slow down")));
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, handles) = envelopes(&["a", "b"]);

        let summary = dispatcher.dispatch(batch).await;
        assert!(summary.batch_failed);

        for result in futures::future::join_all(handles).await {
            match result {
                Err(RpcError::Http { status, url, kind }) => {
                    assert_eq!(status, 429);
                    assert_eq!(url, URL);
                    assert_eq!(kind, HttpErrorKind::RateLimited);
                }
                other => panic!("expected http error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_transport_timeout_fails_whole_batch() {
        let transport = MockTransport::new(|_| Err(TransportError::Timeout));
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, handles) = envelopes(&["a", "b", "c"]);

        let summary = dispatcher.dispatch(batch).await;
        assert_eq!(summary.rejected, 3);

        for result in futures::future::join_all(handles).await {
            assert!(matches!(result, Err(RpcError::Timeout { .. })));
        }
    }

    #[tokio::test]
    async fn test_response_without_id_fails_whole_batch() {
        let transport = MockTransport::new(|_| {
            Ok(TransportResponse::new(200, r#"[{"id": 1, "result": 1}, {"result": 2}]"#))
        });
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, handles) = envelopes(&["a", "b"]);

        dispatcher.dispatch(batch).await;

        for result in futures::future::join_all(handles).await {
            match result {
                Err(RpcError::MalformedResponse { reason, .. }) => {
                    assert_eq!(reason, "Response has empty id");
                }
                other => panic!("expected malformed response, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_non_array_body_fails_whole_batch() {
        let transport = MockTransport::new(|_| Ok(TransportResponse::new(200, "{}")));
        let dispatcher = Dispatcher::new(transport, URL);
        let (batch, handles) = envelopes(&["a"]);

        dispatcher.dispatch(batch).await;

        let result = futures::future::join_all(handles).await.pop().unwrap();
        assert!(matches!(result, Err(RpcError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_transport() {
        let transport = MockTransport::echo_results();
        let dispatcher = Dispatcher::new(transport.clone(), URL);

        let summary = dispatcher.dispatch(Vec::new()).await;

        assert_eq!(summary, DispatchSummary::default());
        assert!(transport.batches().is_empty());
    }
}
