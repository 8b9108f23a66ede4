//! WebSocket upgrade handling and socket lifecycle
//!
//! Each socket is split into a writer task draining the connection's
//! outbound queue and a reader loop feeding parsed frames to the
//! [`RelayHandler`]. Close tears both down and unregisters the connection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::RelayState;
use crate::websocket::messages::RelayMessage;
use crate::websocket::relay::RelayHandler;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, Extension(state): Extension<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = state.register(tx);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward queued frames to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let relay = RelayHandler::new(conn_id, state.clone());
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<RelayMessage>(&text) {
                    Ok(message) => relay.handle_message(message).await,
                    Err(e) => {
                        debug!(conn_id = %conn_id, error = %e, "Dropping unparseable frame");
                    }
                },
                Ok(Message::Binary(_)) => {
                    debug!(conn_id = %conn_id, "Ignoring binary frame");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    debug!(conn_id = %conn_id, "WebSocket close received");
                    break;
                }
                Err(e) => {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    // Whichever side finishes first tears down the other
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.disconnect(conn_id);
}
