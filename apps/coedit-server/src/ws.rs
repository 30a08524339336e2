//! WebSocket endpoint: identity handshake, the per-connection send task, and
//! the receive loop feeding the hub. Identity arrives as a URL-decoded query
//! parameter; rejected connections are closed with 1003 (bad identity) or
//! 1008 (duplicate identity) before any registration side effects.
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use coedit::{CoeditError, ConnId, Frame, Identity};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    identity: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.identity))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, identity: Option<String>) {
    let identity = Identity::new(identity.unwrap_or_default());
    let conn_id = ConnId::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    if let Err(err) = state.hub.connect(&identity, conn_id, tx) {
        let (code, reason) = match err {
            CoeditError::InvalidIdentity => (close_code::UNSUPPORTED, "missing or blank identity"),
            CoeditError::AlreadyConnected(_) => (close_code::POLICY, "identity already connected"),
        };
        warn!("rejecting connection: {err}");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.into(),
            })))
            .await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Forward hub frames to the socket.
    let send_identity = identity.clone();
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame {
                Frame::Message(msg) => match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(err) => {
                        error!("failed to serialize frame for {send_identity}: {err}");
                        continue;
                    }
                },
                Frame::Notice(text) => text,
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                debug!("send to {send_identity} failed, stopping forwarder");
                break;
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => state.hub.handle_text(&identity, &text),
            Ok(Message::Binary(data)) => {
                debug!("ignoring binary frame from {identity} ({} bytes)", data.len());
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("close frame from {identity}");
                break;
            }
            Err(err) => {
                debug!("websocket error from {identity}: {err}");
                break;
            }
        }
    }

    state.hub.disconnect(&identity, conn_id);
    send_task.abort();
    info!("websocket closed: {identity}");
}
