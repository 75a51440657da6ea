//! JsonRpcProvider against a scripted node.

#![allow(clippy::unwrap_used, clippy::panic)]

use batchrpc_eth::{BlockTag, JsonRpcProvider, LogFilter, RpcError, TopicFilter};
use batchrpc_testing::init_test_tracing;
use futures::future::join_all;
use serde_json::{Map, Value, json};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers each call from a method table. Methods mapped to an object
/// with an `error` key answer with that error object.
struct Node {
    results: Map<String, Value>,
}

impl Respond for Node {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let calls: Vec<Value> = serde_json::from_slice(&request.body).unwrap();
        let entries: Vec<Value> = calls
            .iter()
            .map(|call| {
                let id = call["id"].clone();
                let method = call["method"].as_str().unwrap();
                match self.results.get(method) {
                    Some(Value::Object(o)) if o.contains_key("error") => {
                        json!({"jsonrpc": "2.0", "id": id, "error": o["error"]})
                    }
                    Some(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                    None => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32601, "message": "the method does not exist"}
                    }),
                }
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(entries)
    }
}

async fn node(results: Value) -> MockServer {
    init_test_tracing();
    let server = MockServer::start().await;
    let Value::Object(results) = results else {
        panic!("results must be an object");
    };
    Mock::given(method("POST"))
        .respond_with(Node { results })
        .mount(&server)
        .await;
    server
}

async fn batches(server: &MockServer) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn transaction() -> Value {
    json!({
        "blockHash": "0xbh",
        "blockNumber": "0x1381e58",
        "from": "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
        "gas": "0x5208",
        "gasPrice": "0x4a817c800",
        "hash": "0xt1",
        "input": "0x",
        "nonce": "0x0",
        "r": "0x1",
        "s": "0x2",
        "to": null,
        "transactionIndex": "0x0",
        "type": "0x0",
        "v": "0x1b",
        "value": "0x0"
    })
}

fn block(transactions: Value) -> Value {
    json!({
        "number": "0x1381e58",
        "hash": "0xblock",
        "timestamp": "0x66a8c3f3",
        "parentHash": "0xparent",
        "difficulty": "0x0",
        "totalDifficulty": "0xc70d815d562d3cfa955",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0xe4e1c0",
        "stateRoot": "0xstate",
        "receiptsRoot": "0xreceipts",
        "miner": "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359",
        "extraData": "0x",
        "transactions": transactions
    })
}

#[tokio::test]
async fn test_get_network_shares_one_batch() {
    let server = node(json!({"net_version": "1", "eth_chainId": "0x1"})).await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    assert_eq!(provider.network(), None);
    let network = provider.ready().await.unwrap();

    assert_eq!((network.network_id, network.chain_id), (1, 1));
    assert_eq!(provider.network(), Some(network));
    assert_eq!(batches(&server).await.len(), 1);

    provider.destroy().await;
}

#[tokio::test]
async fn test_concurrent_calls_are_batched() {
    let server = node(json!({"eth_blockNumber": "0x1381e58"})).await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let calls = (0..8).map(|_| provider.get_block_number());
    let results = join_all(calls).await;

    assert!(results.into_iter().all(|r| r.unwrap() == 20_455_000));
    let sizes: Vec<usize> = batches(&server).await.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![6, 2]);

    provider.destroy().await;
}

#[tokio::test]
async fn test_get_block_with_prefetched_transactions() {
    let server = node(json!({"eth_getBlockByNumber": block(json!([transaction()]))})).await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let block = provider.get_block(20_455_000_u64, true).await.unwrap().unwrap();

    assert_eq!(block.number, 20_455_000);
    assert_eq!(block.miner, "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359");
    assert_eq!(block.total_difficulty, Some(58_750_003_716_598_352_816_469));
    assert_eq!(block.transactions, vec!["0xt1"]);
    let txs = block.prefetched_transactions.unwrap();
    assert_eq!(txs[0].from, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    assert_eq!(txs[0].to, None);
    assert_eq!(txs[0].v, Some(27));

    let sent = batches(&server).await;
    assert_eq!(sent[0][0]["params"], json!(["0x1381e58", true]));

    provider.destroy().await;
}

#[tokio::test]
async fn test_get_block_missing() {
    let server = node(json!({"eth_getBlockByNumber": null})).await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let block = provider.get_block(BlockTag::Pending, false).await.unwrap();
    assert_eq!(block, None);

    provider.destroy().await;
}

#[tokio::test]
async fn test_get_logs() {
    let server = node(json!({
        "eth_getLogs": [{
            "address": "0xdbf03b407c01e7cd3cbea99509d93f8dddc8c6fb",
            "blockHash": "0xbh",
            "blockNumber": "0x1381e58",
            "data": "0x",
            "logIndex": "0x1",
            "removed": false,
            "topics": ["0xddf2"],
            "transactionHash": "0xth",
            "transactionIndex": "0x4"
        }]
    }))
    .await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let filter = LogFilter::range(20_455_000_u64, 20_455_000_u64)
        .topic(TopicFilter::Exact("0xddf2".into()));
    let logs = provider.get_logs(&filter).await.unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].address, "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB");
    assert_eq!((logs[0].index, logs[0].transaction_index), (1, 4));

    let sent = batches(&server).await;
    assert_eq!(
        sent[0][0]["params"],
        json!([{
            "address": null,
            "topics": ["0xddf2"],
            "fromBlock": "0x1381e58",
            "toBlock": "0x1381e58"
        }])
    );

    provider.destroy().await;
}

#[tokio::test]
async fn test_rpc_error_is_isolated() {
    let server = node(json!({
        "eth_blockNumber": "0x10",
        "eth_getBalance": {"error": {"code": -32000, "message": "header not found", "data": "0xdead"}}
    }))
    .await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let (balance, head) = tokio::join!(
        provider.api("eth_getBalance", vec![json!("0xabc"), json!("latest")]),
        provider.get_block_number(),
    );

    assert_eq!(head.unwrap(), 16);
    let err = balance.unwrap_err();
    assert_eq!(err.code(), Some(-32000));
    assert_eq!(err.to_string(), "header not found");
    let RpcError::Rpc { method, params, data, url, .. } = err else {
        panic!("expected an rpc error");
    };
    assert_eq!(method, "eth_getBalance");
    assert_eq!(params, vec![json!("0xabc"), json!("latest")]);
    assert_eq!(data, Some(json!("0xdead")));
    assert_eq!(url, server.uri());
    assert_eq!(batches(&server).await.len(), 1);

    provider.destroy().await;
}

#[tokio::test]
async fn test_decode_failure() {
    let server = node(json!({"eth_blockNumber": {"unexpected": true}})).await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let err = provider.get_block_number().await.unwrap_err();
    assert!(matches!(err, RpcError::Decode { ref method, .. } if method == "eth_blockNumber"));

    provider.destroy().await;
}

#[tokio::test]
async fn test_rate_limited_batch() {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    let (a, b) = tokio::join!(provider.get_block_number(), provider.get_network());

    assert_eq!(a.unwrap_err().status(), Some(429));
    assert_eq!(b.unwrap_err().to_string(), "Rate limit (429)");

    provider.destroy().await;
}

#[tokio::test]
async fn test_destroy() {
    let server = node(json!({"eth_blockNumber": "0x1"})).await;
    let provider = JsonRpcProvider::new(server.uri()).unwrap();

    assert_eq!(provider.get_block_number().await.unwrap(), 1);
    provider.destroy().await;
    provider.destroy().await;

    assert!(provider.is_destroyed());
    let err = provider.get_block_number().await.unwrap_err();
    assert!(matches!(err, RpcError::ShutdownInProgress));
    assert_eq!(err.to_string(), "Provider is destroyed");
}

#[tokio::test]
async fn test_rejects_non_http_url() {
    assert!(JsonRpcProvider::new("wss://node").is_err());
}
