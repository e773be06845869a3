//! Chat match engine
//!
//! Built on top of the event registry's MESSAGE_CREATE event: keeps a short
//! per-channel history of recent messages and evaluates registered predicates
//! against each incoming message, in registration order. Every matching entry
//! runs (fan-out), each handler awaited before the next entry is evaluated.

use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{ChatMessage, EventType};
use crate::registry::{event_handler, EventRegistry};
use crate::session::SessionState;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

/// Predicate over a chat message
pub type MatchPredicate = Box<dyn Fn(&ChatMessage) -> bool + Send + Sync>;

/// Handler bound to a matcher, given the full message
pub type MatchHandler = Box<dyn Fn(ChatMessage) -> BoxFuture<'static, HandlerResult<()>> + Send + Sync>;

struct MatchEntry {
    predicate: MatchPredicate,
    handler: MatchHandler,
    /// Whether this entry may fire on messages authored by the session's own
    /// user (suppression is per entry, not global)
    reply_to_self: bool,
}

/// Fixed-capacity sliding window of a channel's most recent messages
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    capacity: usize,
    slots: VecDeque<ChatMessage>,
}

impl ChannelBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, message: ChatMessage) {
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(message);
    }

    /// The buffered messages, oldest first
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.slots.iter().cloned().collect()
    }
}

/// Binds chat messages to handlers through arbitrary predicates
///
/// Owned by one session: attach it to that session's event registry with
/// [`ChatMatcher::attach`]. Entries are evaluated in registration order.
pub struct ChatMatcher {
    state: Arc<SessionState>,
    buffer_capacity: usize,
    buffers: Mutex<HashMap<String, ChannelBuffer>>,
    entries: RwLock<Vec<Arc<MatchEntry>>>,
}

impl ChatMatcher {
    /// Create a matcher over a session's state with the default history
    /// capacity of 3 messages per channel
    #[must_use]
    pub fn new(state: Arc<SessionState>) -> Arc<Self> {
        Self::with_buffer_capacity(state, 3)
    }

    /// Create a matcher with a custom history capacity; 0 disables buffering
    #[must_use]
    pub fn with_buffer_capacity(state: Arc<SessionState>, buffer_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state,
            buffer_capacity,
            buffers: Mutex::new(HashMap::new()),
            entries: RwLock::new(Vec::new()),
        })
    }

    /// Register this matcher as the session's MESSAGE_CREATE handler
    pub fn attach(self: &Arc<Self>, events: &mut EventRegistry) {
        let matcher = Arc::clone(self);
        events.register(
            EventType::MessageCreate.as_str(),
            event_handler(move |payload| {
                let matcher = Arc::clone(&matcher);
                async move { matcher.handle_message_create(payload).await }
            }),
        );
    }

    /// Bind a handler to a message predicate
    ///
    /// `reply_to_self = false` skips messages authored by the session's own
    /// user for this entry.
    pub fn register_match<P, F, Fut>(&self, predicate: P, handler: F, reply_to_self: bool)
    where
        P: Fn(&ChatMessage) -> bool + Send + Sync + 'static,
        F: Fn(ChatMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        self.entries.write().push(Arc::new(MatchEntry {
            predicate: Box::new(predicate),
            handler: Box::new(move |message| Box::pin(handler(message))),
            reply_to_self,
        }));
    }

    /// Bind a handler to a predicate over just the message's text content
    pub fn register_content_match<P, F, Fut>(&self, predicate: P, handler: F, reply_to_self: bool)
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
        F: Fn(ChatMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        self.register_match(move |message| predicate(&message.content), handler, reply_to_self);
    }

    /// Snapshot of a channel's history buffer, oldest message first
    #[must_use]
    pub fn channel_history(&self, channel_id: &str) -> Vec<ChatMessage> {
        self.buffers
            .lock()
            .get(channel_id)
            .map(ChannelBuffer::messages)
            .unwrap_or_default()
    }

    /// The MESSAGE_CREATE handler: buffer the message, then evaluate every
    /// entry in registration order
    async fn handle_message_create(&self, payload: Value) -> HandlerResult<()> {
        let message: ChatMessage = serde_json::from_value(payload)
            .map_err(|e| HandlerError::InvalidPayload(format!("not a chat message: {e}")))?;

        if self.buffer_capacity > 0 {
            let mut buffers = self.buffers.lock();
            buffers
                .entry(message.channel_id.clone())
                .or_insert_with(|| ChannelBuffer::new(self.buffer_capacity))
                .push(message.clone());
        }

        let own_user_id = self.state.user().map(|user| user.id);
        let entries: Vec<Arc<MatchEntry>> = self.entries.read().clone();

        for (index, entry) in entries.iter().enumerate() {
            let from_self = own_user_id.as_deref() == Some(message.author.id.as_str());
            if from_self && !entry.reply_to_self {
                continue;
            }

            if (entry.predicate)(&message) {
                // A failing handler does not abort the remaining entries
                if let Err(e) = (entry.handler)(message.clone()).await {
                    tracing::error!(index, error = %e, "Match handler failed");
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ChatMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatMatcher")
            .field("buffer_capacity", &self.buffer_capacity)
            .field("entries", &self.entries.read().len())
            .field("channels", &self.buffers.lock().len())
            .finish()
    }
}
