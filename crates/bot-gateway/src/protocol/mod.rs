//! Gateway wire protocol
//!
//! The envelope format, operation codes, handshake payloads, and dispatch
//! event types carried over the streaming connection.

mod envelope;
mod events;
mod opcodes;
mod payloads;

pub use envelope::Envelope;
pub use events::{Author, ChatMessage, EventType, Guild, ReadyPayload, User};
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, Presence, ResumePayload};
