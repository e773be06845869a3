//! Handshake payload definitions
//!
//! Payload structures for the control envelopes exchanged during and after
//! the handshake.

use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// First envelope received after connecting. The interval parameterizes the
/// heartbeat monitor for the lifetime of the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
///
/// Presents the bot credential, static connection properties, and the
/// initial presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Bot credential token
    pub token: String,

    /// Static connection properties
    pub properties: IdentifyProperties,

    /// Whether the client accepts compressed payloads
    pub compress: bool,

    /// Initial presence/status block
    pub presence: Presence,
}

impl IdentifyPayload {
    /// Build the standard identify payload for a token: default properties,
    /// no compression, online presence.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::default(),
            compress: false,
            presence: Presence::online(),
        }
    }
}

/// Client connection properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,
    /// Client library name
    pub browser: String,
    /// Device type
    pub device: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "tokio-tungstenite".to_string(),
            device: "tokio-tungstenite".to_string(),
        }
    }
}

/// Presence/status block carried in Identify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presence {
    /// Unix timestamp the presence was set
    pub since: i64,
    /// Status string ("online", "idle", "dnd", "offline")
    pub status: String,
    /// Whether the client is away from keyboard
    pub afk: bool,
}

impl Presence {
    /// An "online, not afk" presence stamped with the current time
    #[must_use]
    pub fn online() -> Self {
        Self {
            since: chrono::Utc::now().timestamp(),
            status: "online".to_string(),
            afk: false,
        }
    }
}

/// Payload for op 6 (Resume)
///
/// Models the field layout only: continuing a dropped session with the
/// stored session id and last-seen sequence is an extension point, not a
/// wired behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Bot credential token
    pub token: String,

    /// Session id assigned by the last READY
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}
