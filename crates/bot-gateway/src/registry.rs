//! Opcode and event registries
//!
//! Mapping-based extension points: at most one handler per opcode or event
//! key. Re-registering a key warns and overwrites (last registration wins).
//! Dispatch awaits the handler inline, so a single envelope is fully
//! processed by its handler before the read loop moves on.

use crate::error::HandlerResult;
use crate::protocol::{Envelope, OpCode};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;

/// Uniform async call contract for opcode handlers (given the whole envelope)
pub type OpcodeHandler = Box<dyn Fn(Envelope) -> BoxFuture<'static, HandlerResult<()>> + Send + Sync>;

/// Uniform async call contract for event handlers (given the `d` payload)
pub type EventHandler = Box<dyn Fn(Value) -> BoxFuture<'static, HandlerResult<()>> + Send + Sync>;

/// Box an async closure into an [`OpcodeHandler`]
pub fn opcode_handler<F, Fut>(f: F) -> OpcodeHandler
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<()>> + Send + 'static,
{
    Box::new(move |envelope| Box::pin(f(envelope)))
}

/// Box an async closure into an [`EventHandler`]
pub fn event_handler<F, Fut>(f: F) -> EventHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<()>> + Send + 'static,
{
    Box::new(move |payload| Box::pin(f(payload)))
}

/// Handlers keyed by opcode, invoked after the session's built-in handling
#[derive(Default)]
pub struct OpcodeRegistry {
    handlers: HashMap<OpCode, OpcodeHandler>,
}

impl OpcodeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to an opcode
    ///
    /// If the opcode is already bound the previous handler is replaced.
    pub fn register(&mut self, op: OpCode, handler: OpcodeHandler) {
        if self.handlers.insert(op, handler).is_some() {
            tracing::warn!(op = %op, "Opcode already registered, re-registering");
        }
    }

    /// Whether a handler is bound for this opcode
    #[must_use]
    pub fn contains(&self, op: OpCode) -> bool {
        self.handlers.contains_key(&op)
    }

    /// Invoke the bound handler, awaited; no-op when the opcode is unbound
    pub async fn dispatch(&self, op: OpCode, envelope: Envelope) -> HandlerResult<()> {
        match self.handlers.get(&op) {
            Some(handler) => handler(envelope).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for OpcodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcodeRegistry")
            .field("opcodes", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Handlers keyed by dispatch event name
///
/// String-keyed so events outside the known table still route.
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<String, EventHandler>,
}

impl EventRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to an event name
    ///
    /// If the event is already bound the previous handler is replaced.
    pub fn register(&mut self, event: impl Into<String>, handler: EventHandler) {
        let event = event.into();
        if self.handlers.insert(event.clone(), handler).is_some() {
            tracing::warn!(event = %event, "Dispatch event already registered, re-registering");
        }
    }

    /// Whether a handler is bound for this event name
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Invoke the bound handler, awaited; no-op when the event is unbound
    pub async fn dispatch(&self, event: &str, payload: Value) -> HandlerResult<()> {
        match self.handlers.get(event) {
            Some(handler) => handler(payload).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
