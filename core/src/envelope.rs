//! Pending calls and their single-assignment outcome slots.
//!
//! An [`Envelope`] is created together with a [`ResponseHandle`]. The
//! envelope carries the call to the dispatcher; the handle stays with the
//! caller. Resolving or rejecting consumes the envelope, so an outcome can
//! be written at most once.

use crate::error::RpcError;
use crate::wire::RequestObject;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Outcome of one call.
pub type RpcResult = Result<Value, RpcError>;

/// One pending call owned by the engine until it is dispatched.
#[derive(Debug)]
pub struct Envelope {
    id: u32,
    method: String,
    params: Vec<Value>,
    outcome: oneshot::Sender<RpcResult>,
}

impl Envelope {
    /// Create an envelope and the handle its caller awaits.
    #[must_use]
    pub fn new(id: u32, method: impl Into<String>, params: Vec<Value>) -> (Self, ResponseHandle) {
        let (tx, rx) = oneshot::channel();
        let envelope = Self {
            id,
            method: method.into(),
            params,
            outcome: tx,
        };
        (envelope, ResponseHandle { id, rx })
    }

    /// Request id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Positional parameters.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Wire-format request entry for this envelope.
    #[must_use]
    pub fn request_object(&self) -> RequestObject<'_> {
        RequestObject::new(self.id, &self.method, &self.params)
    }

    /// Split into call data and the outcome slot.
    #[must_use]
    pub fn into_parts(self) -> (u32, String, Vec<Value>, Outcome) {
        (self.id, self.method, self.params, Outcome(self.outcome))
    }

    /// Deliver a successful result.
    pub fn resolve(self, value: Value) {
        Outcome(self.outcome).resolve(value);
    }

    /// Deliver an error.
    pub fn reject(self, error: RpcError) {
        Outcome(self.outcome).reject(error);
    }

    /// Whether the caller dropped its handle.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.outcome.is_closed()
    }
}

/// Write side of an envelope's outcome slot, detached from the call data.
#[derive(Debug)]
pub struct Outcome(oneshot::Sender<RpcResult>);

impl Outcome {
    /// Deliver a successful result.
    pub fn resolve(self, value: Value) {
        // A dropped handle means nobody is waiting
        let _ = self.0.send(Ok(value));
    }

    /// Deliver an error.
    pub fn reject(self, error: RpcError) {
        let _ = self.0.send(Err(error));
    }
}

/// Caller side of a submitted call.
///
/// Resolves once the call's batch has been dispatched. If the engine drops
/// the envelope without an outcome, the handle yields [`RpcError::Canceled`].
#[derive(Debug)]
#[must_use = "a response handle does nothing unless awaited"]
pub struct ResponseHandle {
    id: u32,
    rx: oneshot::Receiver<RpcResult>,
}

impl ResponseHandle {
    /// Id assigned to the call.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }
}

impl Future for ResponseHandle {
    type Output = RpcResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RpcError::Canceled)))
    }
}
