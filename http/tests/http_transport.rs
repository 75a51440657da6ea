//! HttpTransport against a local mock server.

#![allow(clippy::unwrap_used, clippy::panic)]

use batchrpc_core::{RpcError, Transport, TransportError};
use batchrpc_http::{HttpTransport, TransportConfig};
use batchrpc_runtime::{BatchConfig, Batcher};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers each request entry with its own params, in reverse order.
struct EchoBatch;

impl Respond for EchoBatch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let entries: Vec<Value> = serde_json::from_slice(&request.body).unwrap();
        let responses: Vec<Value> = entries
            .iter()
            .rev()
            .map(|e| json!({"jsonrpc": "2.0", "id": e["id"], "result": e["params"]}))
            .collect();
        ResponseTemplate::new(200).set_body_json(responses)
    }
}

fn transport() -> HttpTransport {
    HttpTransport::new(&TransportConfig::default()).unwrap()
}

#[tokio::test]
async fn test_posts_json_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport().post(&server.uri(), b"[]".to_vec()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(&response.body[..], b"[]");
}

#[tokio::test]
async fn test_error_status_is_not_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let response = transport().post(&server.uri(), b"[]".to_vec()).await.unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(&response.body[..], b"slow down");
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = TransportConfig {
        request_timeout_secs: 1,
        ..TransportConfig::default()
    };
    let transport = HttpTransport::new(&config).unwrap();

    let err = transport.post(&server.uri(), b"[]".to_vec()).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn test_connection_refused() {
    // Reserve a free port, then release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let uri = format!("http://127.0.0.1:{port}");
    let err = transport().post(&uri, b"[]".to_vec()).await.unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
}

#[tokio::test]
async fn test_https_url_against_plain_server() {
    let server = MockServer::start().await;

    // The https pool only speaks TLS, so a plain server cannot answer it
    let https_uri = server.uri().replacen("http://", "https://", 1);
    let err = transport().post(&https_uri, b"[]".to_vec()).await.unwrap_err();

    assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
}

#[tokio::test]
async fn test_batcher_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(EchoBatch)
        .expect(1)
        .mount(&server)
        .await;

    let batcher = Batcher::new(transport(), server.uri(), BatchConfig::default());

    let a = batcher.submit("eth_getBalance", vec![json!("0xa")]).unwrap();
    let b = batcher.submit("eth_getBalance", vec![json!("0xb")]).unwrap();
    let c = batcher.submit("eth_getBalance", vec![json!("0xc")]).unwrap();
    let (a, b, c) = tokio::join!(a, b, c);

    assert_eq!(a.unwrap(), json!(["0xa"]));
    assert_eq!(b.unwrap(), json!(["0xb"]));
    assert_eq!(c.unwrap(), json!(["0xc"]));

    batcher.shutdown().await;
    assert!(batcher.transport().is_closed());
}

#[tokio::test]
async fn test_batcher_maps_http_statuses() {
    for (status, expected) in [
        (403_u16, "Forbidden (403)"),
        (429, "Rate limit (429)"),
        (500, "Server error (500)"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let batcher = Batcher::new(transport(), server.uri(), BatchConfig::default());

        let a = batcher.submit("eth_blockNumber", vec![]).unwrap();
        let b = batcher.submit("eth_chainId", vec![]).unwrap();
        let (a, b) = tokio::join!(a, b);

        for result in [a, b] {
            let err = result.unwrap_err();
            assert!(matches!(err, RpcError::Http { .. }));
            assert_eq!(err.to_string(), expected);
        }

        batcher.shutdown().await;
    }
}

#[tokio::test]
async fn test_batcher_rejects_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let batcher = Batcher::new(transport(), server.uri(), BatchConfig::default());

    let err = batcher.call("eth_blockNumber", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::MalformedResponse { .. }), "got {err:?}");

    batcher.shutdown().await;
}
