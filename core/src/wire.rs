//! JSON-RPC 2.0 batch wire format.
//!
//! Requests go out as a JSON array of
//! `{"jsonrpc": "2.0", "id": <uint>, "method": <string>, "params": <array>}`.
//! Responses come back as an array of `{"id": <uint>, "result": <any>}` or
//! `{"id": <uint>, "error": {"code": <int>, "message": <string>, "data": <any>}}`
//! in any order, and are correlated back to requests by id.

use crate::envelope::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Protocol version tag sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// One request entry of a batch body.
#[derive(Debug, Clone, Serialize)]
pub struct RequestObject<'a> {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: &'static str,
    /// Request id
    pub id: u32,
    /// Method name
    pub method: &'a str,
    /// Positional parameters
    pub params: &'a [Value],
}

impl<'a> RequestObject<'a> {
    /// Create a request entry.
    #[must_use]
    pub const fn new(id: u32, method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// Error object carried by a failed response entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorObject {
    /// Error code
    #[serde(default)]
    pub code: i64,
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Optional extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Decode an entry's `error` member.
    ///
    /// Members that are not a well-formed error object still fail the
    /// call: they become code `0`, with the raw value as `data` and its
    /// text (or the string itself) as the message.
    #[must_use]
    pub fn from_member(raw: Value) -> Self {
        if let Ok(error) = Self::deserialize(&raw) {
            return error;
        }
        let message = match &raw {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self {
            code: 0,
            message,
            data: Some(raw),
        }
    }
}

/// Decoded response entry for one id.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEntry {
    /// The call succeeded; `null` results are kept as `Value::Null`
    Result(Value),
    /// The call failed at the protocol level
    Error(ErrorObject),
}

/// Reasons a success-status body cannot be correlated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WireError {
    /// Body is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Body is valid JSON but not an array
    #[error("expected a response array, got {0}")]
    NotAnArray(String),

    /// An array element is not an object
    #[error("response entry at index {0} is not an object")]
    EntryNotObject(usize),

    /// An entry has no usable id
    #[error("Response has empty id")]
    EmptyId,
}

/// Serialize a batch of envelopes into one request body.
///
/// # Errors
///
/// Returns the serializer error if a parameter value cannot be encoded.
pub fn encode_batch(batch: &[Envelope]) -> Result<Vec<u8>, serde_json::Error> {
    let objects: Vec<RequestObject<'_>> = batch.iter().map(Envelope::request_object).collect();
    serde_json::to_vec(&objects)
}

/// Response entries of one round trip, keyed by request id.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMap {
    entries: HashMap<u32, ResponseEntry>,
}

impl CorrelationMap {
    /// Decode a response body and index its entries by id.
    ///
    /// A later entry for the same id replaces an earlier one. Entries whose
    /// id is present but not a `u32` are skipped: they cannot match any
    /// request, so the request they were meant for surfaces as missing.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the body is not a JSON array of objects or
    /// any entry lacks an id. Everything else about an entry with a usable
    /// id is that call's own outcome.
    pub fn from_slice(body: &[u8]) -> Result<Self, WireError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| WireError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Index an already decoded response body.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CorrelationMap::from_slice`].
    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(WireError::NotAnArray(describe_non_array(&other))),
        };

        let mut entries = HashMap::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(object) = item else {
                return Err(WireError::EntryNotObject(index));
            };
            if let Some((id, entry)) = decode_entry(object)? {
                entries.insert(id, entry);
            }
        }

        Ok(Self { entries })
    }

    /// Remove and return the entry for `id`.
    pub fn take(&mut self, id: u32) -> Option<ResponseEntry> {
        self.entries.remove(&id)
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_entry(mut object: Map<String, Value>) -> Result<Option<(u32, ResponseEntry)>, WireError> {
    let id = match object.get("id") {
        None | Some(Value::Null) => return Err(WireError::EmptyId),
        Some(Value::Number(n)) if n.as_u64() == Some(0) => return Err(WireError::EmptyId),
        Some(Value::String(s)) if s.is_empty() => return Err(WireError::EmptyId),
        Some(raw) => match raw.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(id) => id,
            None => return Ok(None),
        },
    };

    match object.remove("error") {
        Some(Value::Null) | None => {
            let result = object.remove("result").unwrap_or(Value::Null);
            Ok(Some((id, ResponseEntry::Result(result))))
        }
        Some(error) => {
            let error = ErrorObject::from_member(error);
            Ok(Some((id, ResponseEntry::Error(error))))
        }
    }
}

fn describe_non_array(value: &Value) -> String {
    match value {
        Value::Object(object) => match object.get("error").and_then(|e| e.get("message")) {
            Some(Value::String(message)) => format!("error object: {message}"),
            _ => "object".to_string(),
        },
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
    }
}
