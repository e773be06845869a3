//! # bot-rest
//!
//! Plain request/response client for the chat REST API. The gateway session
//! uses it once to resolve the streaming endpoint; outbound chat helpers use
//! it to create messages and upload files.

mod client;
mod error;
mod outbox;

pub use client::{GatewayInfo, RestClient};
pub use error::{RestError, RestResult};
pub use outbox::Outbox;
