//! WebSocket Handler
//!
//! Each connection mounts its own [`MemoBoard`] and streams list snapshots
//! to the client until the socket closes, then releases the live feed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::{ClientMessage, ServerMessage};
use crate::api::AppState;
use crate::memos::{LiveFeed, MemoBoard};

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let hub = Arc::clone(&state.ws_hub);
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            if let Ok(text) = serde_json::to_string(&ServerMessage::Error {
                message: e.to_string(),
            }) {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let _ = tx.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
    });

    let board = Arc::new(MemoBoard::new(Arc::clone(&state.backend)));
    let feed = mount_board(&board, &hub, &connection_id).await;

    // Task to push a snapshot whenever the board changes
    let mut snapshots = board.watch();
    let snapshot_tx = tx.clone();
    let snapshot_task = tokio::spawn(async move {
        loop {
            let memos = snapshots.borrow_and_update().as_slice().to_vec();
            if snapshot_tx.send(ServerMessage::Memos { memos }).is_err() {
                break;
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    });

    let conn_id_for_send = connection_id.clone();

    // Task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_for_send,
                            "WebSocket send failed, closing connection"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let board_for_recv = Arc::clone(&board);
    let conn_id_for_recv = connection_id.clone();

    // Task to receive messages from WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &board_for_recv, &conn_id_for_recv, msg)
                        .await
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    snapshot_task.abort();
    if let Some(feed) = feed {
        feed.unmount().await;
    }
    hub.unregister(&connection_id).await;
}

/// Start the board's live feed; without one the client still gets a
/// fetched list and can refresh by hand.
async fn mount_board(
    board: &Arc<MemoBoard>,
    hub: &ConnectionHub,
    connection_id: &str,
) -> Option<LiveFeed> {
    match board.mount().await {
        Ok(feed) => Some(feed),
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to subscribe to memo feed");
            let _ = hub
                .send_to(
                    connection_id,
                    ServerMessage::Error {
                        message: format!("Live updates unavailable: {}", e),
                    },
                )
                .await;
            board.fetch().await;
            None
        }
    }
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(
    hub: &ConnectionHub,
    board: &MemoBoard,
    connection_id: &str,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(hub, board, connection_id, client_msg).await;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    // Send error but keep connection open
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(
    hub: &ConnectionHub,
    board: &MemoBoard,
    connection_id: &str,
    message: ClientMessage,
) {
    let reply = match message {
        ClientMessage::Add { content } => {
            let failed = board.add(&content).await.is_none() && !content.trim().is_empty();
            failed.then(|| "Failed to add memo".to_string())
        }
        ClientMessage::Delete { id } => {
            (!board.delete(id).await).then(|| format!("Failed to delete memo {}", id))
        }
        ClientMessage::Refresh => {
            if board.fetch().await {
                // Unchanged lists publish nothing, so answer explicitly
                let _ = hub
                    .send_to(
                        connection_id,
                        ServerMessage::Memos {
                            memos: board.snapshot(),
                        },
                    )
                    .await;
                None
            } else {
                Some("Failed to fetch memos".to_string())
            }
        }
        ClientMessage::Ping => {
            let _ = hub.send_to(connection_id, ServerMessage::Pong).await;
            None
        }
    };

    if let Some(message) = reply {
        let _ = hub
            .send_to(connection_id, ServerMessage::Error { message })
            .await;
    }
}
