//! REST client integration tests against an in-process mock API.

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bot_common::BotConfig;
use bot_rest::{Outbox, RestClient, RestError};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Shared record of what the mock API received
#[derive(Clone, Default)]
struct ApiState {
    auth_headers: Arc<Mutex<Vec<String>>>,
    messages: Arc<Mutex<Vec<(String, String)>>>,
    multiparts: Arc<Mutex<Vec<String>>>,
}

async fn gateway_bot(State(state): State<ApiState>, headers: HeaderMap) -> Json<Value> {
    if let Some(auth) = headers.get("authorization") {
        state
            .auth_headers
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or_default().to_string());
    }
    Json(json!({ "url": "wss://gateway.example", "shards": 1 }))
}

async fn create_message(
    State(state): State<ApiState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        state.multiparts.lock().unwrap().push(channel_id);
    } else {
        let body: Value = serde_json::from_slice(&body).unwrap_or_default();
        let content = body["content"].as_str().unwrap_or_default().to_string();
        state.messages.lock().unwrap().push((channel_id, content));
    }

    Json(json!({ "id": "1" }))
}

async fn teapot() -> StatusCode {
    StatusCode::IM_A_TEAPOT
}

async fn spawn_api() -> Result<(SocketAddr, ApiState)> {
    let state = ApiState::default();

    let app = Router::new()
        .route("/api/gateway/bot", get(gateway_bot))
        .route("/api/channels/:channel_id/messages", post(create_message))
        .route("/api/teapot", get(teapot))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((addr, state))
}

fn client_for(addr: SocketAddr) -> RestClient {
    let config = BotConfig::new("T").with_api_url(format!("http://{addr}/api"));
    RestClient::new(&config)
}

#[tokio::test]
async fn resolves_gateway_endpoint_with_bot_credential() -> Result<()> {
    let (addr, state) = spawn_api().await?;
    let client = client_for(addr);

    let info = client.gateway_info().await?;

    assert_eq!(info.url, "wss://gateway.example");
    assert_eq!(state.auth_headers.lock().unwrap().as_slice(), ["Bot T"]);
    Ok(())
}

#[tokio::test]
async fn creates_message_in_channel() -> Result<()> {
    let (addr, state) = spawn_api().await?;
    let client = client_for(addr);

    client.create_message("C1", "pong").await?;

    let messages = state.messages.lock().unwrap();
    assert_eq!(messages.as_slice(), [("C1".to_string(), "pong".to_string())]);
    Ok(())
}

#[tokio::test]
async fn uploads_file_as_multipart() -> Result<()> {
    let (addr, state) = spawn_api().await?;
    let client = client_for(addr);

    client
        .upload_file("C2", "log.txt", b"hello".to_vec(), json!({ "content": "dump" }))
        .await?;

    assert_eq!(state.multiparts.lock().unwrap().as_slice(), ["C2"]);
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_a_hard_error() -> Result<()> {
    let (addr, _state) = spawn_api().await?;
    let client = client_for(addr);

    let result: Result<Value, _> = client.get("/teapot").await;

    match result {
        Err(RestError::Status { status, path }) => {
            assert_eq!(status, StatusCode::IM_A_TEAPOT);
            assert_eq!(path, "/teapot");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn outbox_preserves_submission_order() -> Result<()> {
    let (addr, state) = spawn_api().await?;
    let outbox = Outbox::new(Arc::new(client_for(addr)));

    outbox.say("C1", "first");
    outbox.say("C1", "second");
    outbox.say("C1", "third");
    outbox.shutdown().await;

    let messages = state.messages.lock().unwrap();
    let contents: Vec<&str> = messages.iter().map(|(_, c)| c.as_str()).collect();
    assert_eq!(contents, ["first", "second", "third"]);
    Ok(())
}
