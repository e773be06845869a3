//! Gateway session
//!
//! The connection state machine, its per-session state, and the heartbeat
//! monitor.

mod gateway;
mod heartbeat;
mod state;

pub use gateway::{Disconnect, GatewaySession, SessionCloseHandle};
pub use state::{ConnectionState, SessionState};
