//! Ordered fire-and-forget sends
//!
//! Handlers must not block event processing on outbound HTTP calls, but
//! submission order has to be preserved per destination channel. A single
//! worker task drains a queue sequentially, which preserves order globally.

use crate::client::RestClient;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A queued outbound send
#[derive(Debug)]
enum OutboundSend {
    Message {
        channel_id: String,
        content: String,
    },
    File {
        channel_id: String,
        filename: String,
        bytes: Vec<u8>,
        payload: Value,
    },
}

/// Background sender for outbound chat actions
///
/// `say` and `send_file` enqueue without awaiting the HTTP call. Failures are
/// logged with the channel id; they never reach the caller.
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundSend>,
    worker: JoinHandle<()>,
}

impl Outbox {
    /// Spawn the outbox worker on the current runtime
    #[must_use]
    pub fn new(client: Arc<RestClient>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundSend>();

        let worker = tokio::spawn(async move {
            while let Some(send) = rx.recv().await {
                match send {
                    OutboundSend::Message { channel_id, content } => {
                        if let Err(e) = client.create_message(&channel_id, &content).await {
                            tracing::error!(
                                channel_id = %channel_id,
                                error = %e,
                                "Failed to send message"
                            );
                        }
                    }
                    OutboundSend::File {
                        channel_id,
                        filename,
                        bytes,
                        payload,
                    } => {
                        if let Err(e) = client
                            .upload_file(&channel_id, &filename, bytes, payload)
                            .await
                        {
                            tracing::error!(
                                channel_id = %channel_id,
                                error = %e,
                                "Failed to upload file"
                            );
                        }
                    }
                }
            }
        });

        Self { tx, worker }
    }

    /// Queue a text message for a channel
    pub fn say(&self, channel_id: impl Into<String>, content: impl Into<String>) {
        let send = OutboundSend::Message {
            channel_id: channel_id.into(),
            content: content.into(),
        };
        if self.tx.send(send).is_err() {
            tracing::warn!("Outbox worker is gone, dropping message");
        }
    }

    /// Queue a file upload for a channel
    ///
    /// `payload` is the JSON part sent alongside the binary attachment.
    pub fn send_file(
        &self,
        channel_id: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        payload: Value,
    ) {
        let send = OutboundSend::File {
            channel_id: channel_id.into(),
            filename: filename.into(),
            bytes,
            payload,
        };
        if self.tx.send(send).is_err() {
            tracing::warn!("Outbox worker is gone, dropping file upload");
        }
    }

    /// Drain the queue and stop the worker
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.worker.await;
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
