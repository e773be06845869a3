//! Gateway bot entry point
//!
//! Run with:
//! ```bash
//! BOT_TOKEN=... cargo run -p bot-gateway
//! ```
//!
//! Configuration is loaded from environment variables. Wires up a minimal
//! ping/pong matcher and keeps the session alive, re-running the handshake
//! when the server asks for a reconnect.

use bot_common::{try_init_tracing, BotConfig};
use bot_gateway::{ChatMatcher, Disconnect, GatewaySession};
use bot_rest::Outbox;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the bot
    if let Err(e) = run().await {
        error!(error = %e, "Bot failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting gateway bot...");

    // Load configuration
    let config = BotConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(api_url = %config.api_url, "Configuration loaded");

    loop {
        let mut session = GatewaySession::new(config.clone());
        let outbox = Arc::new(Outbox::new(session.rest()));

        // Reply "pong" to "ping", never to our own messages
        let matcher = ChatMatcher::with_buffer_capacity(session.state(), config.buffer_capacity);
        let outbox_clone = Arc::clone(&outbox);
        matcher.register_content_match(
            |content| content == "ping",
            move |message| {
                let outbox = Arc::clone(&outbox_clone);
                async move {
                    outbox.say(message.channel_id, "pong");
                    Ok(())
                }
            },
            false,
        );
        matcher.attach(session.events_mut());

        // Each session owns fresh state; a reconnect re-runs the handshake
        match session.run().await? {
            Disconnect::Closed => {
                info!("Session closed, exiting");
                return Ok(());
            }
            reason @ (Disconnect::Dropped
            | Disconnect::Stale
            | Disconnect::ReconnectRequested
            | Disconnect::SessionInvalidated) => {
                warn!(reason = ?reason, "Disconnected, re-running handshake");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
