//! Bot configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or unparsable
    #[error("Missing or invalid environment variable: {0}")]
    MissingVar(&'static str),
}

/// Bot configuration
///
/// Everything the bot needs to authenticate against the REST API and
/// open its gateway connection.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot credential token (sent as `Authorization: Bot <token>`)
    pub token: String,

    /// Base URL of the REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Descriptive client identifier sent as the `User-Agent` header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Gateway protocol version appended to the connection URL
    #[serde(default = "default_gateway_version")]
    pub gateway_version: u8,

    /// Per-channel chat history buffer capacity (0 disables buffering)
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

// Default value functions
fn default_api_url() -> String {
    "https://discordapp.com/api".to_string()
}

fn default_user_agent() -> String {
    "GatewayBot (Rust, tokio-tungstenite)".to_string()
}

fn default_gateway_version() -> u8 {
    6
}

fn default_buffer_capacity() -> usize {
    3
}

impl BotConfig {
    /// Create a config with defaults for everything except the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            gateway_version: default_gateway_version(),
            buffer_capacity: default_buffer_capacity(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `BOT_TOKEN` is missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            token: env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingVar("BOT_TOKEN"))?,
            api_url: env::var("BOT_API_URL").unwrap_or_else(|_| default_api_url()),
            user_agent: env::var("BOT_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
            gateway_version: env::var("BOT_GATEWAY_VERSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_gateway_version),
            buffer_capacity: env::var("BOT_BUFFER_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_buffer_capacity),
        })
    }

    /// Override the REST base URL (used against local test servers)
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the per-channel buffer capacity
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}
