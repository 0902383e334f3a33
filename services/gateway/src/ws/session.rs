//! Manages the WebSocket connection lifecycle for one client session.

use crate::{
    state::AppState,
    ws::{dispatch, protocol::ServerResponse},
};
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use kit_gateway_core::session::Session;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// The session greets the client, then processes inbound frames strictly
/// sequentially: one frame, one handler, one response, in arrival order.
/// That single loop is the whole concurrency story for a connection; other
/// connections run in their own tasks and share nothing mutable.
#[instrument(name = "ws_session", skip_all, fields(session_id = %Uuid::new_v4()))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("new WebSocket connection, awaiting authentication");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut session = Session::new(state.config.max_history);

    let welcome = ServerResponse::success(
        "welcome",
        "connected, authenticate with your API key",
        json!({ "state": session.state() }),
    );
    if let Err(error) = send_response(&mut socket_tx, &welcome).await {
        warn!(%error, "failed to send welcome frame");
        return;
    }

    while let Some(frame) = socket_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                info!(%error, "client connection lost");
                break;
            }
        };

        let response = match frame {
            Message::Text(text) => {
                dispatch::dispatch_text(&mut session, &state, text.as_str()).await
            }
            Message::Binary(bytes) => {
                dispatch::dispatch_binary(&mut session, &state, &bytes).await
            }
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            // Axum answers pings at the protocol layer.
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        if let Err(error) = send_response(&mut socket_tx, &response).await {
            warn!(%error, "failed to send response, closing session");
            break;
        }
    }

    match session.device_id() {
        Some(device_id) => info!(device_id, state = %session.state(), "session closed"),
        None => info!(state = %session.state(), "session closed before registration"),
    }
}

/// Serializes and sends one `ServerResponse` as a single text frame.
async fn send_response(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    response: &ServerResponse,
) -> Result<()> {
    let serialized = serde_json::to_string(response)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
