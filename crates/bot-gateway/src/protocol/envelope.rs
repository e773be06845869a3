//! Gateway envelope format
//!
//! Every message on the streaming connection is one `{op, d, s, t}` record.
//! `op` selects handling, `d` is the opcode-specific payload, `s` is the
//! server-assigned sequence number on dispatch envelopes, and `t` names the
//! dispatch event type.

use super::{HelloPayload, IdentifyPayload, OpCode, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The universal wire record
///
/// `op` stays a raw integer so that an envelope with an opcode outside the
/// known table still decodes; callers use [`Envelope::opcode`] and treat
/// `None` as a protocol anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation code
    pub op: u8,

    /// Opcode-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,

    /// Sequence number (dispatch envelopes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event type (dispatch envelopes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl Envelope {
    // === Client-sent envelopes ===

    /// Create a Heartbeat envelope (op=1) carrying the last-seen sequence
    ///
    /// The payload is an explicit JSON null until a sequence has been seen.
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat.as_u8(),
            d: Some(sequence.map_or(Value::Null, Into::into)),
            s: None,
            t: None,
        }
    }

    /// Create an Identify envelope (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self {
            op: OpCode::Identify.as_u8(),
            d: serde_json::to_value(payload).ok(),
            s: None,
            t: None,
        }
    }

    /// Create a Resume envelope (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self {
            op: OpCode::Resume.as_u8(),
            d: serde_json::to_value(payload).ok(),
            s: None,
            t: None,
        }
    }

    // === Server-sent envelopes (constructed in tests and mocks) ===

    /// Create a Dispatch envelope (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch.as_u8(),
            d: Some(data),
            s: Some(sequence),
            t: Some(event_type.into()),
        }
    }

    /// Create a Hello envelope (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self {
            op: OpCode::Hello.as_u8(),
            d: serde_json::to_value(HelloPayload { heartbeat_interval }).ok(),
            s: None,
            t: None,
        }
    }

    /// Create a Heartbeat ACK envelope (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck.as_u8(),
            d: None,
            s: None,
            t: None,
        }
    }

    /// Create a bare control envelope with no payload
    #[must_use]
    pub fn control(op: OpCode) -> Self {
        Self {
            op: op.as_u8(),
            d: None,
            s: None,
            t: None,
        }
    }

    // === Accessors ===

    /// The typed opcode, if the raw value is in the known table
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    /// Try to parse the payload as a Hello (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.opcode() != Some(OpCode::Hello) {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// The dispatch event name, for op=0 envelopes
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        if self.opcode() != Some(OpCode::Dispatch) {
            return None;
        }
        self.t.as_deref()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.opcode().map_or("Unknown", OpCode::name);
        if let Some(t) = &self.t {
            write!(f, "Envelope(op={} {name}, t={t}", self.op)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "Envelope(op={} {name})", self.op)
        }
    }
}
