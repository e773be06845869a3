//! Gateway error types

use thiserror::Error;

/// Errors that abort the gateway session itself
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Resolving the gateway endpoint failed
    #[error("REST error: {0}")]
    Rest(#[from] bot_rest::RestError),

    /// WebSocket transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The writer task is gone, nothing can be sent anymore
    #[error("Outbound channel closed")]
    WriterClosed,

    /// `run` was called on a session that already consumed its connection
    #[error("Session already ran")]
    AlreadyRan,
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised by registered handlers (opcode, event, or match)
///
/// Handler failures are isolated: the session logs them and keeps
/// delivering to the remaining handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not have the shape the handler expected
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The handler body failed
    #[error("Handler failed: {0}")]
    Failed(String),
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
