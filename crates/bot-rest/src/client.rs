//! Authenticated REST client
//!
//! All calls carry the bot credential (`Authorization: Bot <token>`) and a
//! descriptive `User-Agent`. A non-success response is a hard failure for
//! the specific call.

use crate::error::{RestError, RestResult};
use bot_common::BotConfig;
use reqwest::multipart::{Form, Part};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Response body of `GET /gateway/bot`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayInfo {
    /// WebSocket endpoint to connect to
    pub url: String,
}

/// REST API client
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_agent: String,
}

impl RestClient {
    /// Create a client from the bot configuration
    #[must_use]
    pub fn new(config: &BotConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Perform a GET request and decode the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RestResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .header("Authorization", self.authorization())
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// Perform a POST request with a JSON body and decode the JSON response
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> RestResult<T> {
        let response = self
            .http
            .post(self.url(path))
            .header("Authorization", self.authorization())
            .header("User-Agent", &self.user_agent)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// Perform a multipart POST request and decode the JSON response
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> RestResult<T> {
        let response = self
            .http
            .post(self.url(path))
            .header("Authorization", self.authorization())
            .header("User-Agent", &self.user_agent)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// Resolve the streaming gateway endpoint
    pub async fn gateway_info(&self) -> RestResult<GatewayInfo> {
        self.get("/gateway/bot").await
    }

    /// Create a message in a channel
    pub async fn create_message(&self, channel_id: &str, content: &str) -> RestResult<Value> {
        let body = serde_json::json!({ "content": content });
        self.post_json(&format!("/channels/{channel_id}/messages"), &body)
            .await
    }

    /// Create a message carrying a file attachment
    ///
    /// Sends a multipart body with a `payload_json` part and a binary `file`
    /// part, matching the create-message upload contract.
    pub async fn upload_file(
        &self,
        channel_id: &str,
        filename: &str,
        bytes: Vec<u8>,
        payload: Value,
    ) -> RestResult<Value> {
        let file_part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?;

        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("file", file_part);

        self.post_multipart(&format!("/channels/{channel_id}/messages"), form)
            .await
    }
}
