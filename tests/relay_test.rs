//! End-to-end tests driving the relay over real WebSocket connections.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use relayroom::{
    registry::ClientRegistry,
    server,
    state::AppState,
};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start the relay on a random port and return its address and state.
async fn start_test_server(state: AppState) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serve_state = state.clone();
    tokio::spawn(async move {
        server::serve(listener, serve_state, std::future::pending())
            .await
            .unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr, user_agent: &str) -> Client {
    connect_at(addr, "/ws", user_agent).await
}

async fn connect_at(addr: SocketAddr, path: &str, user_agent: &str) -> Client {
    let mut request = format!("ws://{addr}{path}").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("user-agent", HeaderValue::from_str(user_agent).unwrap());
    let (client, _) = connect_async(request).await.unwrap();
    client
}

/// Connect and consume the welcome frame, returning it alongside the client.
async fn join(addr: SocketAddr, user_agent: &str) -> (Client, Value) {
    let mut client = connect(addr, user_agent).await;
    let welcome = recv_json(&mut client).await;
    (client, welcome)
}

async fn recv_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Binary(bytes) => return serde_json::from_slice(&bytes).unwrap(),
            _ => continue,
        }
    }
}

/// Asserts nothing arrives on `client` for a short while.
async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

async fn only_client_id(state: &AppState) -> String {
    let snapshot = state.registry.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    snapshot[0].id.to_string()
}

async fn wait_for_clients(state: &AppState, count: usize) {
    for _ in 0..100 {
        if state.registry.len().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("registry never reached {count} clients");
}

#[tokio::test]
async fn new_client_receives_current_game_state() {
    let (addr, _state) = start_test_server(AppState::default()).await;

    let (_client, welcome) = join(addr, "client-a").await;

    assert_eq!(welcome, json!({ "type": "game-state", "gameState": { "score": 1 } }));
}

#[tokio::test]
async fn chat_is_relayed_to_everyone_including_sender() {
    let (addr, state) = start_test_server(AppState::default()).await;
    let (mut alice, _) = join(addr, "alice-agent").await;
    let alice_id = only_client_id(&state).await;
    let (mut bob, _) = join(addr, "bob-agent").await;

    send_json(&mut alice, json!({ "type": "chat", "message": "hi" })).await;

    let expected = json!({
        "type": "chat",
        "message": "hi",
        "senderId": alice_id,
        "userAgent": "alice-agent",
    });
    assert_eq!(recv_json(&mut alice).await, expected);
    assert_eq!(recv_json(&mut bob).await, expected);
}

#[tokio::test]
async fn game_state_update_reaches_all_and_new_clients() {
    let (addr, state) = start_test_server(AppState::default()).await;
    let (mut alice, _) = join(addr, "a").await;
    let (mut bob, _) = join(addr, "b").await;

    let update = json!({ "type": "game-state", "gameState": { "score": 42 } });
    send_json(&mut alice, update.clone()).await;

    assert_eq!(recv_json(&mut alice).await, update);
    assert_eq!(recv_json(&mut bob).await, update);
    assert_eq!(
        serde_json::to_value(state.game_state.get().await).unwrap(),
        json!({ "score": 42 })
    );

    let (_carol, welcome) = join(addr, "c").await;
    assert_eq!(welcome, update);
}

#[tokio::test]
async fn disconnected_client_is_skipped() {
    let (addr, state) = start_test_server(AppState::default()).await;
    let (mut alice, _) = join(addr, "a").await;
    let (mut bob, _) = join(addr, "b").await;

    bob.close(None).await.unwrap();
    wait_for_clients(&state, 1).await;

    send_json(&mut alice, json!({ "type": "chat", "message": "still here?" })).await;

    let relayed = recv_json(&mut alice).await;
    assert_eq!(relayed["message"], "still here?");

    // Alice's connection is still usable afterwards
    send_json(&mut alice, json!({ "type": "chat", "message": "yes" })).await;
    assert_eq!(recv_json(&mut alice).await["message"], "yes");
}

#[tokio::test]
async fn malformed_frame_is_ignored() {
    let (addr, _state) = start_test_server(AppState::default()).await;
    let (mut alice, _) = join(addr, "a").await;
    let (mut bob, _) = join(addr, "b").await;

    alice.send(Message::Text("{definitely not json".into())).await.unwrap();
    send_json(&mut alice, json!({ "type": "unknown-kind" })).await;

    assert_silent(&mut bob).await;

    send_json(&mut alice, json!({ "type": "chat", "message": "after" })).await;
    assert_eq!(recv_json(&mut bob).await["message"], "after");
    assert_eq!(recv_json(&mut alice).await["message"], "after");
}

#[tokio::test]
async fn disconnect_unregisters_client() {
    let (addr, state) = start_test_server(AppState::default()).await;
    let (alice, _) = join(addr, "a").await;
    assert_eq!(state.registry.len().await, 1);

    drop(alice);

    wait_for_clients(&state, 0).await;
}

#[tokio::test]
async fn full_registry_closes_new_connection() {
    let (addr, state) =
        start_test_server(AppState::new(ClientRegistry::with_capacity(1), Default::default()))
            .await;
    let (_alice, _) = join(addr, "a").await;

    let mut bob = connect(addr, "b").await;
    let msg = tokio::time::timeout(Duration::from_secs(2), bob.next())
        .await
        .expect("timed out waiting for close");
    match msg {
        Some(Ok(Message::Close(Some(frame)))) => assert_eq!(u16::from(frame.code), 1013),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert_eq!(state.registry.len().await, 1);
}

#[tokio::test]
async fn root_path_also_upgrades() {
    let (addr, _state) = start_test_server(AppState::default()).await;

    let mut client = connect_at(addr, "/", "root-client").await;

    assert_eq!(
        recv_json(&mut client).await,
        json!({ "type": "game-state", "gameState": { "score": 1 } })
    );
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (addr, _state) = start_test_server(AppState::default()).await;

    let resp = reqwest::get(format!("http://{addr}/api/health")).await.unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn state_endpoint_reports_score_and_clients() {
    let (addr, state) = start_test_server(AppState::default()).await;
    let (mut alice, _) = join(addr, "a").await;
    let (_bob, _) = join(addr, "b").await;

    send_json(
        &mut alice,
        json!({ "type": "game-state", "gameState": { "score": 17 } }),
    )
    .await;
    recv_json(&mut alice).await;
    wait_for_clients(&state, 2).await;

    let body: Value = reqwest::get(format!("http://{addr}/api/state"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({ "gameState": { "score": 17 }, "clients": 2 }));
}
