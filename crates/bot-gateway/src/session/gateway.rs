//! Gateway session state machine
//!
//! Owns the transport, drives the handshake, decodes incoming envelopes, and
//! routes them: built-in opcode handling first, then the opcode registry;
//! dispatch envelopes additionally go through the event registry. A writer
//! task serializes all outbound envelopes (identify, heartbeats, anything a
//! handler sends) so the read path never blocks on a write.

use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{Envelope, EventType, Guild, IdentifyPayload, OpCode, ReadyPayload};
use crate::registry::{EventRegistry, OpcodeRegistry};
use crate::session::{heartbeat, ConnectionState, SessionState};
use bot_common::BotConfig;
use bot_rest::RestClient;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Why a session ended
///
/// Graceful shutdown and abrupt drops are distinct conditions; the owner
/// decides whether to re-run the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// Server sent a close frame, or the owner closed the session
    Closed,
    /// The transport ended without a close frame
    Dropped,
    /// The heartbeat monitor never saw an ack for its last beat
    Stale,
    /// Server sent Reconnect (op 7); restart the handshake
    ReconnectRequested,
    /// Server sent InvalidSession (op 9); the stored session id is void
    SessionInvalidated,
}

/// Handle for closing a running session from outside the read loop
#[derive(Debug, Clone)]
pub struct SessionCloseHandle {
    closer: Arc<Notify>,
}

impl SessionCloseHandle {
    /// Ask the session to stop; `run` returns `Disconnect::Closed`
    pub fn close(&self) {
        self.closer.notify_one();
    }
}

/// A single long-lived gateway connection
///
/// Registries and session state are owned per instance; two sessions never
/// share handlers or buffers. Lifecycle:
/// `Disconnected → Connecting → AwaitingHello → Identifying → Ready`,
/// ending in `Closed`.
pub struct GatewaySession {
    config: BotConfig,
    rest: Arc<RestClient>,
    state: Arc<SessionState>,
    opcodes: OpcodeRegistry,
    events: EventRegistry,
    outbound_tx: mpsc::UnboundedSender<Envelope>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Envelope>>,
    stale: Arc<Notify>,
    closer: Arc<Notify>,
    heartbeat: Option<JoinHandle<()>>,
}

impl GatewaySession {
    /// Create a session with fresh state and empty registries
    #[must_use]
    pub fn new(config: BotConfig) -> Self {
        let rest = Arc::new(RestClient::new(&config));
        Self::with_rest(config, rest)
    }

    /// Create a session sharing an existing REST client
    #[must_use]
    pub fn with_rest(config: BotConfig, rest: Arc<RestClient>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            config,
            rest,
            state: Arc::new(SessionState::new()),
            opcodes: OpcodeRegistry::new(),
            events: EventRegistry::new(),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            stale: Arc::new(Notify::new()),
            closer: Arc::new(Notify::new()),
            heartbeat: None,
        }
    }

    /// Shared view of the session state
    #[must_use]
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// The REST client this session resolves its endpoint with
    #[must_use]
    pub fn rest(&self) -> Arc<RestClient> {
        Arc::clone(&self.rest)
    }

    /// The event registry, for wiring up dispatch handlers
    pub fn events_mut(&mut self) -> &mut EventRegistry {
        &mut self.events
    }

    /// The opcode registry, for wiring up low-level handlers
    pub fn opcodes_mut(&mut self) -> &mut OpcodeRegistry {
        &mut self.opcodes
    }

    /// Handle for closing the session while `run` is in flight
    #[must_use]
    pub fn close_handle(&self) -> SessionCloseHandle {
        SessionCloseHandle {
            closer: Arc::clone(&self.closer),
        }
    }

    /// Resolve the gateway endpoint, connect, and drive the session to
    /// completion
    ///
    /// Returns how the connection ended; transport-level protocol failures
    /// surface as errors. Either way the heartbeat monitor is cancelled and
    /// the transport dropped before returning.
    pub async fn run(&mut self) -> GatewayResult<Disconnect> {
        let mut outbound_rx = self.outbound_rx.take().ok_or(GatewayError::AlreadyRan)?;

        self.state.set_connection_state(ConnectionState::Connecting);
        let info = self.rest.gateway_info().await?;
        let url = format!(
            "{}/?v={}&encoding=json",
            info.url.trim_end_matches('/'),
            self.config.gateway_version
        );

        let (ws, _response) = connect_async(url.as_str()).await?;
        tracing::info!(url = %url, "Gateway connected");
        self.state.set_connection_state(ConnectionState::AwaitingHello);

        let (mut sink, mut stream) = ws.split();

        // Single writer task: serializes concurrent writes from the read
        // path, the heartbeat monitor, and any handler.
        let writer = tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                match envelope.to_json() {
                    Ok(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            tracing::warn!(error = %e, "Outbound send failed, stopping writer");
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to encode outbound envelope"),
                }
            }
            let _ = sink.close().await;
        });

        let disconnect = self.read_loop(&mut stream).await;

        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        writer.abort();
        self.state.set_connection_state(ConnectionState::Closed);

        match &disconnect {
            Ok(reason) => tracing::info!(reason = ?reason, "Session ended"),
            Err(e) => tracing::error!(error = %e, "Session ended with transport failure"),
        }
        disconnect
    }

    async fn read_loop(&mut self, stream: &mut WsStream) -> GatewayResult<Disconnect> {
        let stale = Arc::clone(&self.stale);
        let closer = Arc::clone(&self.closer);

        loop {
            tokio::select! {
                () = stale.notified() => return Ok(Disconnect::Stale),
                () = closer.notified() => return Ok(Disconnect::Closed),
                message = stream.next() => match message {
                    None => return Ok(Disconnect::Dropped),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Transport failed");
                        return Ok(Disconnect::Dropped);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(frame = ?frame, "Server closed the connection");
                        return Ok(Disconnect::Closed);
                    }
                    Some(Ok(Message::Text(text))) => match Envelope::from_json(&text) {
                        Ok(envelope) => {
                            if let Some(disconnect) = self.handle_envelope(envelope).await? {
                                return Ok(disconnect);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Undecodable frame"),
                    },
                    // Ping/pong/binary frames carry no envelopes
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    /// Built-in opcode handling, then the opcode registry
    ///
    /// Returns a `Disconnect` when the envelope asks for teardown.
    async fn handle_envelope(&mut self, envelope: Envelope) -> GatewayResult<Option<Disconnect>> {
        let mut disconnect = None;

        match envelope.opcode() {
            Some(OpCode::Dispatch) => {
                if let Some(s) = envelope.s {
                    self.state.record_sequence(s);
                }
                self.handle_dispatch(&envelope).await;
            }
            Some(OpCode::Heartbeat) => {
                // Server asked for an immediate beat
                self.send(Envelope::heartbeat(self.state.sequence()))?;
            }
            Some(OpCode::Reconnect) => {
                tracing::warn!("Server requested reconnect");
                disconnect = Some(Disconnect::ReconnectRequested);
            }
            Some(OpCode::InvalidSession) => {
                tracing::warn!("Server invalidated the session");
                disconnect = Some(Disconnect::SessionInvalidated);
            }
            Some(OpCode::Hello) => match envelope.as_hello() {
                Some(hello) => {
                    tracing::info!(
                        heartbeat_interval = hello.heartbeat_interval,
                        "Hello received"
                    );
                    if let Some(previous) = self.heartbeat.take() {
                        previous.abort();
                    }
                    self.heartbeat = Some(heartbeat::spawn(
                        Arc::clone(&self.state),
                        self.outbound_tx.clone(),
                        hello.heartbeat_interval,
                        Arc::clone(&self.stale),
                    ));
                    self.state.set_connection_state(ConnectionState::Identifying);
                    self.identify()?;
                }
                None => tracing::warn!("Hello payload missing heartbeat_interval"),
            },
            Some(OpCode::HeartbeatAck) => self.state.set_ack(true),
            Some(other) => {
                tracing::debug!(op = %other, "Opcode with no built-in handling");
            }
            None => tracing::warn!(op = envelope.op, "Unknown op code"),
        }

        // User handler runs after the built-in handling, for any opcode
        if let Some(op) = envelope.opcode() {
            if self.opcodes.contains(op) {
                if let Err(e) = self.opcodes.dispatch(op, envelope.clone()).await {
                    tracing::error!(op = %op, error = %e, "Opcode handler failed");
                }
            }
        }

        Ok(disconnect)
    }

    /// Built-in dispatch handling, then the event registry
    async fn handle_dispatch(&mut self, envelope: &Envelope) {
        let Some(event) = envelope.t.as_deref() else {
            tracing::warn!("Dispatch envelope without event type");
            return;
        };
        let payload = envelope.d.clone().unwrap_or(Value::Null);

        match EventType::parse(event) {
            Some(EventType::Ready) => self.handle_ready(&payload),
            Some(EventType::GuildCreate) => self.handle_guild_create(&payload),
            _ => {}
        }

        if self.events.contains(event) {
            if let Err(e) = self.events.dispatch(event, payload).await {
                tracing::error!(event = %event, error = %e, "Event handler failed");
            }
        }
    }

    fn handle_ready(&self, payload: &Value) {
        if self.state.session_id().is_some() {
            tracing::warn!("Repeat READY received although session is already running");
            return;
        }

        match serde_json::from_value::<ReadyPayload>(payload.clone()) {
            Ok(ready) => {
                tracing::info!(
                    username = %ready.user.username,
                    guilds = ready.guilds.len(),
                    "Session ready"
                );
                self.state.set_user(ready.user);
                self.state.set_session_id(ready.session_id);
                for guild in ready.guilds {
                    self.state.insert_guild(guild);
                }
                self.state.set_private_channels(ready.private_channels);
                self.state.set_connection_state(ConnectionState::Ready);
            }
            Err(e) => tracing::warn!(error = %e, "Undecodable READY payload"),
        }
    }

    fn handle_guild_create(&self, payload: &Value) {
        match serde_json::from_value::<Guild>(payload.clone()) {
            Ok(guild) => {
                if let Some(known) = self.state.guild(&guild.id) {
                    if !known.unavailable {
                        tracing::warn!(
                            guild_id = %guild.id,
                            name = %guild.name,
                            "Repeat GUILD_CREATE for available guild"
                        );
                    }
                }
                self.state.insert_guild(guild);
            }
            Err(e) => tracing::warn!(error = %e, "Undecodable GUILD_CREATE payload"),
        }
    }

    /// Present credentials and initial presence; sent once, right after Hello
    fn identify(&self) -> GatewayResult<()> {
        let payload = IdentifyPayload::new(self.config.token.as_str());
        tracing::debug!("Sending identify");
        self.send(Envelope::identify(&payload))
    }

    /// Queue an envelope for the writer task
    pub fn send(&self, envelope: Envelope) -> GatewayResult<()> {
        self.outbound_tx
            .send(envelope)
            .map_err(|_| GatewayError::WriterClosed)
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("state", &self.state)
            .field("events", &self.events)
            .field("opcodes", &self.opcodes)
            .finish()
    }
}
