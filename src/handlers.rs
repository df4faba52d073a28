use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message as WsMessage, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use futures::{stream::StreamExt, Sink, SinkExt};
use serde_json::{json, Value};
use std::{fmt, net::SocketAddr, ops::ControlFlow, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    broadcast::broadcast,
    error::AppError,
    message::{ClientId, Message},
    state::AppState,
};

/// Descriptor recorded for clients that send no `User-Agent`.
pub const UNKNOWN_DESCRIPTOR: &str = "Unknown";

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn game_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let game_state = serde_json::to_value(state.game_state.get().await)?;
    let clients = state.registry.len().await;
    Ok(Json(json!({ "gameState": game_state, "clients": clients })))
}

pub(crate) async fn ws(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let descriptor = descriptor_from_headers(&headers);
    ws.on_upgrade(move |socket| handle_connection(socket, addr, descriptor, state))
}

/// The client-supplied descriptor, taken from the `User-Agent` header.
pub fn descriptor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(UNKNOWN_DESCRIPTOR)
        .to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::Open => "open",
            Phase::Closing => "closing",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Per-connection data the receive loop dispatches with.
struct Context {
    state: Arc<AppState>,
    id: ClientId,
    descriptor: String,
}

impl Context {
    /// Decode one inbound frame and act on it. Undecodable frames are dropped.
    async fn dispatch(&self, frame: &[u8]) {
        let message = match Message::decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!("Dropping frame from {}: {err}", self.id);
                return;
            }
        };

        match message {
            Message::Chat { message, .. } => {
                debug!("Chat from {}: {message:?}", self.id);
                let relay = Message::Chat {
                    message,
                    sender_id: Some(self.id),
                    user_agent: Some(self.descriptor.clone()),
                };
                let reached = broadcast(&self.state.registry, &relay).await;
                debug!("Relayed chat from {} to {reached} clients", self.id);
            }
            Message::GameState { game_state } => {
                debug!("Game state update from {}: {game_state:?}", self.id);
                let reached = self
                    .state
                    .game_state
                    .update(game_state, &self.state.registry)
                    .await;
                debug!("Sent game state to {reached} clients");
            }
        }
    }
}

/// Handle an incoming WebSocket message
async fn handle_message(msg: WsMessage, context: &Context) -> ControlFlow<(), ()> {
    match msg {
        WsMessage::Close(_) => {
            debug!("Received close message from {}", context.id);
            ControlFlow::Break(())
        }
        WsMessage::Text(text) => {
            context.dispatch(text.as_bytes()).await;
            ControlFlow::Continue(())
        }
        WsMessage::Binary(bytes) => {
            context.dispatch(&bytes).await;
            ControlFlow::Continue(())
        }
        _ => ControlFlow::Continue(()),
    }
}

/// Drive one WebSocket connection from accept to close.
async fn handle_connection(
    socket: WebSocket,
    addr: SocketAddr,
    descriptor: String,
    state: Arc<AppState>,
) {
    let mut phase = Phase::Connecting;
    // Split the socket so we can send and receive at the same time
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let client_id = match state.registry.register(tx, descriptor.clone()).await {
        Ok(id) => id,
        Err(err) => {
            warn!("Refusing client at {addr}: {err}");
            let close = WsMessage::Close(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: err.to_string().into(),
            }));
            let _ = sender.send(close).await;
            return;
        }
    };
    transition(&mut phase, Phase::Open, client_id);
    info!("Client {client_id} connected from {addr} ({descriptor})");

    if let Err(err) = send_welcome(&mut sender, &state).await {
        warn!("Error sending game state to {client_id}: {err}");
        transition(&mut phase, Phase::Closing, client_id);
        state.registry.unregister(&client_id).await;
        transition(&mut phase, Phase::Closed, client_id);
        return;
    }

    // Forward queued frames to the socket in the order they were queued
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(err) = sender.send(WsMessage::Text(frame)).await {
                debug!("Error sending to {client_id}: {err}");
                break;
            }
        }
    });

    let context = Context {
        state: state.clone(),
        id: client_id,
        descriptor,
    };
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(err) => {
                    warn!("Error receiving from {}: {err}", context.id);
                    break;
                }
            };
            if handle_message(msg, &context).await.is_break() {
                break;
            }
        }
    });

    // Wait for one of the send/recv tasks to stop and then kill the other one
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }
    transition(&mut phase, Phase::Closing, client_id);

    state.registry.unregister(&client_id).await;
    transition(&mut phase, Phase::Closed, client_id);
    info!("Client {client_id} disconnected");
}

/// Send the current game state to a freshly opened connection only.
async fn send_welcome<S>(sender: &mut S, state: &AppState) -> Result<(), AppError>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: fmt::Display,
{
    let frame = Message::game_state(state.game_state.get().await).encode()?;
    sender
        .send(WsMessage::Text(frame))
        .await
        .map_err(|err| AppError::Error(err.to_string()))
}

fn transition(phase: &mut Phase, next: Phase, id: ClientId) {
    debug!("Client {id}: {phase} -> {next}");
    *phase = next;
}
