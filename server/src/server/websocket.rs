use super::{AppState, Connection};
use crate::protocol::{AckStatus, ClientMessage, ErrorCode, ServerMessage};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!("New WebSocket connection: {}", connection_id);

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // Register connection
    {
        let mut connections = state.connections.write().await;
        connections.insert(
            connection_id,
            Connection {
                id: connection_id,
                connected_at: Instant::now(),
            },
        );
        gauge!("txflow_ws_connections_active").set(connections.len() as f64);
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward outgoing messages to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize {} message: {}", msg.message_type(), e);
                }
            }
        }
    });

    // Push the current view, then every published change
    let mut updates = state.driver.subscribe();
    let update_tx = tx.clone();
    let update_task = tokio::spawn(async move {
        let view = updates.borrow_and_update().clone();
        if update_tx.send(ServerMessage::State { view }).await.is_err() {
            return;
        }
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            if update_tx.send(ServerMessage::State { view }).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, connection_id, &state, &tx).await;
                }
                Err(e) => {
                    warn!("Failed to parse client message: {}", e);
                    let _ = tx
                        .send(ServerMessage::Error {
                            code: ErrorCode::InvalidMessage,
                            message: format!("Invalid message format: {}", e),
                        })
                        .await;
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} requested close", connection_id);
                break;
            }
            Ok(_) => {
                // Binary and control frames carry nothing for the demo
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Cleanup
    update_task.abort();
    send_task.abort();

    {
        let mut connections = state.connections.write().await;
        if let Some(conn) = connections.remove(&connection_id) {
            debug!(
                "Connection {} lasted {:?}",
                conn.id,
                conn.connected_at.elapsed()
            );
        }
        gauge!("txflow_ws_connections_active").set(connections.len() as f64);
    }

    info!("WebSocket connection closed: {}", connection_id);
}

/// Handle a parsed client message
async fn handle_client_message(
    msg: ClientMessage,
    connection_id: Uuid,
    state: &AppState,
    tx: &mpsc::Sender<ServerMessage>,
) {
    counter!("txflow_ws_messages_total", "type" => msg.message_type()).increment(1);
    let seq = msg.seq();

    let (accepted, reason) = match msg {
        ClientMessage::Ping { .. } => {
            let _ = tx.send(ServerMessage::Pong).await;
            (true, None)
        }
        ClientMessage::Start { .. } => {
            info!("Start requested by {}", connection_id);
            outcome(state.driver.start().await, "Demo is already running")
        }
        ClientMessage::Reset { .. } => {
            info!("Reset requested by {}", connection_id);
            outcome(
                state.driver.reset().await,
                "Cannot reset while the demo is running",
            )
        }
        ClientMessage::Ingest { contents, .. } => {
            info!(
                "Ingest requested by {} ({} bytes)",
                connection_id,
                contents.len()
            );
            outcome(
                state.driver.ingest(contents).await,
                "Demo is running or the file is empty",
            )
        }
    };

    let _ = tx
        .send(ServerMessage::Ack {
            ack_seq: seq,
            status: if accepted {
                AckStatus::Ok
            } else {
                AckStatus::Rejected
            },
            reason,
        })
        .await;
}

/// Attach the rejection reason only to rejected commands
fn outcome(accepted: bool, reason: &str) -> (bool, Option<String>) {
    (accepted, (!accepted).then(|| reason.to_string()))
}
