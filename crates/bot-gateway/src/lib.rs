//! # bot-gateway
//!
//! Persistent-connection client for the real-time chat gateway: one
//! long-lived WebSocket, the Hello/Identify handshake, heartbeat liveness,
//! and an extensible routing layer for opcodes, dispatch events, and chat
//! message matchers.

pub mod error;
pub mod matcher;
pub mod protocol;
pub mod registry;
pub mod session;

// Re-export commonly used types at crate root
pub use error::{GatewayError, GatewayResult, HandlerError, HandlerResult};
pub use matcher::ChatMatcher;
pub use registry::{EventRegistry, OpcodeRegistry};
pub use session::{ConnectionState, Disconnect, GatewaySession, SessionCloseHandle, SessionState};
