//! WebSocket connection handlers.
//!
//! Each connection task only shuttles frames between the socket and the
//! broker task; it never touches room or session state itself.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::ClientId,
    ui::state::{AppState, BrokerCommand, ConnectQuery},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // The query parameter is the transport routing identity; reject
    // malformed ids before upgrading.
    let client_id = match ClientId::try_from(query.client_id.clone()) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!("Invalid client_id format: '{}'", query.client_id);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, client_id.into_string())))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, client_id: String) {
    // Channel the broker task uses to address this client.
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    if state
        .commands
        .send(BrokerCommand::Attach {
            client_id: client_id.clone(),
            sender: tx,
        })
        .is_err()
    {
        tracing::error!("Broker task is gone, dropping connection for '{client_id}'");
        return;
    }
    tracing::info!("Client '{client_id}' connected");

    let (mut sender, mut receiver) = socket.split();

    let recv_state = state.clone();
    let recv_id = client_id.clone();

    // Forward inbound frames to the broker task.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error for '{recv_id}': {e}");
                    break;
                }
            };

            let bytes = match msg {
                Message::Binary(bytes) => bytes.to_vec(),
                Message::Text(text) => text.as_bytes().to_vec(),
                Message::Close(_) => {
                    tracing::info!("Client '{recv_id}' requested close");
                    break;
                }
                // Ping/pong is handled by the protocol layer.
                _ => continue,
            };

            if recv_state
                .commands
                .send(BrokerCommand::Frame {
                    client_id: recv_id.clone(),
                    bytes,
                })
                .is_err()
            {
                break;
            }
        }
    });

    // Forward broker deliveries to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            if sender.send(Message::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Only the live connection is released. There is no leave protocol:
    // room membership and history stay behind.
    let _ = state.commands.send(BrokerCommand::Detach {
        client_id: client_id.clone(),
    });
    tracing::info!("Connection for '{client_id}' closed");
}
