//! # batchrpc Core
//!
//! Shared types for batching JSON-RPC calls over HTTP.
//!
//! This crate holds everything the coalescing engine and its collaborators
//! agree on, without any scheduling or I/O of its own.
//!
//! ## Core Concepts
//!
//! - **Envelope**: one pending call plus its write-once outcome slot
//! - **ResponseHandle**: the future a caller awaits for that outcome
//! - **IdGenerator**: per-engine request id counter
//! - **Wire types**: batch request encoding and response correlation
//! - **Transport**: the HTTP `POST` contract the dispatcher relies on
//! - **RpcError**: the error every caller observes, batch-level or per-call
//!
//! ## Example
//!
//! ```
//! use batchrpc_core::{CorrelationMap, Envelope, IdGenerator, ResponseEntry};
//! use serde_json::json;
//!
//! let mut ids = IdGenerator::new();
//! let (envelope, _handle) = Envelope::new(ids.next_id(), "eth_blockNumber", vec![]);
//!
//! let body = br#"[{"jsonrpc": "2.0", "id": 1, "result": "0x10"}]"#;
//! let mut responses = CorrelationMap::from_slice(body).unwrap_or_default();
//!
//! assert_eq!(responses.take(envelope.id()), Some(ResponseEntry::Result(json!("0x10"))));
//! ```

pub mod envelope;
pub mod error;
pub mod id;
pub mod transport;
pub mod wire;

pub use envelope::{Envelope, Outcome, ResponseHandle, RpcResult};
pub use error::{HttpErrorKind, RpcError, TransportError};
pub use id::IdGenerator;
pub use transport::{CONTENT_TYPE_JSON, Transport, TransportResponse};
pub use wire::{CorrelationMap, ErrorObject, JSONRPC_VERSION, RequestObject, ResponseEntry, WireError};
