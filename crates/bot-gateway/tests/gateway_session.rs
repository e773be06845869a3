//! End-to-end session tests against an in-process gateway and REST mock.
//!
//! The mock gateway is a plain WebSocket accept loop scripted per test; the
//! REST mock resolves `/gateway/bot` to it and records create-message calls.

use anyhow::Result;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bot_common::BotConfig;
use bot_gateway::{ChatMatcher, ConnectionState, Disconnect, GatewaySession};
use bot_rest::Outbox;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type ServerWs = WebSocketStream<TcpStream>;

/// Messages the REST mock received, as (channel_id, content)
#[derive(Clone, Default)]
struct ApiState {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

async fn create_message(
    State(state): State<ApiState>,
    Path(channel_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let content = body["content"].as_str().unwrap_or_default().to_string();
    state.messages.lock().unwrap().push((channel_id, content));
    Json(json!({ "id": "1" }))
}

/// Bind the mock gateway and REST API; the returned config points at them
async fn start_mocks() -> Result<(BotConfig, ApiState, TcpListener)> {
    let gateway_listener = TcpListener::bind("127.0.0.1:0").await?;
    let gateway_addr = gateway_listener.local_addr()?;

    let state = ApiState::default();
    let app = Router::new()
        .route(
            "/api/gateway/bot",
            get(move || async move { Json(json!({ "url": format!("ws://{gateway_addr}") })) }),
        )
        .route("/api/channels/:channel_id/messages", post(create_message))
        .with_state(state.clone());

    let api_listener = TcpListener::bind("127.0.0.1:0").await?;
    let api_addr = api_listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(api_listener, app).await.ok();
    });

    let config = BotConfig::new("T").with_api_url(format!("http://{api_addr}/api"));
    Ok((config, state, gateway_listener))
}

async fn accept_ws(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.expect("accept failed");
    tokio_tungstenite::accept_async(stream).await.expect("ws handshake failed")
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string())).await.expect("send failed");
}

async fn recv_json(ws: &mut ServerWs) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for client frame")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("client sent invalid JSON");
        }
    }
}

/// Receive client frames until one with the wanted opcode arrives
async fn recv_op(ws: &mut ServerWs, op: u64) -> Value {
    loop {
        let value = recv_json(ws).await;
        if value["op"] == json!(op) {
            return value;
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn ready_payload() -> Value {
    json!({
        "user": {"id": "U0", "username": "bot"},
        "session_id": "S1",
        "guilds": [{"id": "G1", "name": "g", "unavailable": false}]
    })
}

#[tokio::test]
async fn handshake_identifies_and_processes_ready() -> Result<()> {
    let (config, _api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let state = session.state();
    let close = session.close_handle();
    let task = tokio::spawn(async move { session.run().await });

    let mut ws = accept_ws(&gateway).await;
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 41250}})).await;

    let identify = recv_op(&mut ws, 2).await;
    assert_eq!(identify["d"]["token"], "T");
    assert_eq!(identify["d"]["compress"], false);
    assert_eq!(identify["d"]["presence"]["status"], "online");
    assert_eq!(identify["d"]["presence"]["afk"], false);

    send_json(&mut ws, json!({"op": 0, "s": 1, "t": "READY", "d": ready_payload()})).await;

    wait_until(|| state.session_id().is_some()).await;
    assert_eq!(state.session_id(), Some("S1".to_string()));
    assert_eq!(state.user().unwrap().username, "bot");
    assert_eq!(state.guild_count(), 1);
    assert_eq!(state.sequence(), Some(1));
    assert_eq!(state.connection_state(), ConnectionState::Ready);

    close.close();
    let disconnect = task.await??;
    assert_eq!(disconnect, Disconnect::Closed);
    assert_eq!(state.connection_state(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn acked_heartbeats_keep_the_session_alive() -> Result<()> {
    let (config, _api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let task = tokio::spawn(async move { session.run().await });

    let mut ws = accept_ws(&gateway).await;
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 50}})).await;
    send_json(&mut ws, json!({"op": 0, "s": 7, "t": "READY", "d": ready_payload()})).await;

    // Three beat/ack cycles; the initial beat races the READY processing,
    // later beats must carry the last-seen sequence
    recv_op(&mut ws, 1).await;
    send_json(&mut ws, json!({"op": 11})).await;
    for _ in 0..2 {
        let beat = recv_op(&mut ws, 1).await;
        assert_eq!(beat["d"], 7);
        send_json(&mut ws, json!({"op": 11})).await;
    }

    ws.close(None).await?;
    let disconnect = task.await??;
    assert_eq!(disconnect, Disconnect::Closed);
    Ok(())
}

#[tokio::test]
async fn missing_heartbeat_ack_ends_the_session_as_stale() -> Result<()> {
    let (config, _api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let task = tokio::spawn(async move { session.run().await });

    let mut ws = accept_ws(&gateway).await;
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 50}})).await;

    // First beat goes out, the ack never comes back
    recv_op(&mut ws, 1).await;

    let disconnect = task.await??;
    assert_eq!(disconnect, Disconnect::Stale);
    Ok(())
}

#[tokio::test]
async fn content_matcher_replies_through_the_outbox() -> Result<()> {
    let (config, api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let outbox = Arc::new(Outbox::new(session.rest()));

    let matcher = ChatMatcher::new(session.state());
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

    let close = session.close_handle();
    let task = tokio::spawn(async move { session.run().await });

    let mut ws = accept_ws(&gateway).await;
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 41250}})).await;
    recv_op(&mut ws, 2).await;
    send_json(&mut ws, json!({"op": 0, "s": 1, "t": "READY", "d": ready_payload()})).await;

    send_json(
        &mut ws,
        json!({"op": 0, "s": 5, "t": "MESSAGE_CREATE", "d": {
            "content": "ping", "channel_id": "C1", "author": {"id": "U1"}
        }}),
    )
    .await;

    wait_until(|| !api.messages.lock().unwrap().is_empty()).await;

    // A ping from the bot's own user is suppressed (reply_to_self = false)
    send_json(
        &mut ws,
        json!({"op": 0, "s": 6, "t": "MESSAGE_CREATE", "d": {
            "content": "ping", "channel_id": "C1", "author": {"id": "U0"}
        }}),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        api.messages.lock().unwrap().as_slice(),
        [("C1".to_string(), "pong".to_string())]
    );

    close.close();
    task.await??;
    Ok(())
}

#[tokio::test]
async fn reconnect_request_tears_the_session_down() -> Result<()> {
    let (config, _api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let task = tokio::spawn(async move { session.run().await });

    let mut ws = accept_ws(&gateway).await;
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 41250}})).await;
    recv_op(&mut ws, 2).await;
    send_json(&mut ws, json!({"op": 7})).await;

    let disconnect = task.await??;
    assert_eq!(disconnect, Disconnect::ReconnectRequested);
    Ok(())
}

#[tokio::test]
async fn invalid_session_tears_the_session_down() -> Result<()> {
    let (config, _api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let task = tokio::spawn(async move { session.run().await });

    let mut ws = accept_ws(&gateway).await;
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 41250}})).await;
    recv_op(&mut ws, 2).await;
    send_json(&mut ws, json!({"op": 9, "d": false})).await;

    let disconnect = task.await??;
    assert_eq!(disconnect, Disconnect::SessionInvalidated);
    Ok(())
}

#[tokio::test]
async fn abrupt_transport_drop_surfaces_as_dropped() -> Result<()> {
    let (config, _api, gateway) = start_mocks().await?;
    let mut session = GatewaySession::new(config);
    let task = tokio::spawn(async move { session.run().await });

    let ws = accept_ws(&gateway).await;
    drop(ws);

    let disconnect = task.await??;
    assert_eq!(disconnect, Disconnect::Dropped);
    Ok(())
}
