//! Per-session mutable state
//!
//! One `SessionState` per gateway connection, constructed fresh on session
//! creation and shared only between that session's read loop and its
//! heartbeat task. Nothing here is process-wide.

use crate::protocol::{Guild, User};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport yet
    Disconnected,
    /// Resolving the endpoint / opening the transport
    Connecting,
    /// Transport open, waiting for the server Hello
    AwaitingHello,
    /// Hello received, Identify sent, waiting for READY
    Identifying,
    /// Handshake complete, receiving dispatches
    Ready,
    /// A resume/re-identify cycle is pending (extension point, never entered
    /// automatically)
    Reconnecting,
    /// Terminal
    Closed,
}

/// The mutable record of the current connection
pub struct SessionState {
    /// Assigned user identity, absent until READY
    user: RwLock<Option<User>>,

    /// Known guilds keyed by guild id
    guilds: RwLock<HashMap<String, Guild>>,

    /// Private message channels delivered by READY
    private_channels: RwLock<Vec<Value>>,

    /// Session identifier, set once per handshake; kept for future resume
    session_id: RwLock<Option<String>>,

    /// Connection lifecycle state
    connection_state: RwLock<ConnectionState>,

    /// Last-seen server sequence number; monotonically non-decreasing while
    /// connected
    sequence: RwLock<Option<u64>>,

    /// True iff a heartbeat-ack arrived since the last heartbeat was sent
    ack: AtomicBool,
}

impl SessionState {
    /// Fresh state for a new session
    #[must_use]
    pub fn new() -> Self {
        Self {
            user: RwLock::new(None),
            guilds: RwLock::new(HashMap::new()),
            private_channels: RwLock::new(Vec::new()),
            session_id: RwLock::new(None),
            connection_state: RwLock::new(ConnectionState::Disconnected),
            sequence: RwLock::new(None),
            ack: AtomicBool::new(true),
        }
    }

    /// The bot's own identity, if READY has been processed
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn set_user(&self, user: User) {
        *self.user.write() = Some(user);
    }

    /// The current session identifier
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    pub fn set_session_id(&self, session_id: impl Into<String>) {
        *self.session_id.write() = Some(session_id.into());
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read()
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        *self.connection_state.write() = state;
    }

    /// Last-seen sequence number, used for heartbeat payloads
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        *self.sequence.read()
    }

    /// Record a dispatch sequence number, keeping the stored value
    /// non-decreasing
    pub fn record_sequence(&self, s: u64) {
        let mut sequence = self.sequence.write();
        match *sequence {
            Some(current) if s < current => {
                tracing::warn!(current, received = s, "Sequence number went backwards, keeping current");
            }
            _ => *sequence = Some(s),
        }
    }

    /// Whether the last heartbeat has been acknowledged
    #[must_use]
    pub fn ack(&self) -> bool {
        self.ack.load(Ordering::SeqCst)
    }

    pub fn set_ack(&self, ack: bool) {
        self.ack.store(ack, Ordering::SeqCst);
    }

    /// Look up a guild by id
    #[must_use]
    pub fn guild(&self, guild_id: &str) -> Option<Guild> {
        self.guilds.read().get(guild_id).cloned()
    }

    /// Store or replace a guild record under its id
    pub fn insert_guild(&self, guild: Guild) {
        self.guilds.write().insert(guild.id.clone(), guild);
    }

    #[must_use]
    pub fn guild_count(&self) -> usize {
        self.guilds.read().len()
    }

    pub fn set_private_channels(&self, channels: Vec<Value>) {
        *self.private_channels.write() = channels;
    }

    #[must_use]
    pub fn private_channels(&self) -> Vec<Value> {
        self.private_channels.read().clone()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("connection_state", &self.connection_state())
            .field("session_id", &self.session_id())
            .field("sequence", &self.sequence())
            .field("ack", &self.ack())
            .field("guilds", &self.guild_count())
            .finish()
    }
}
