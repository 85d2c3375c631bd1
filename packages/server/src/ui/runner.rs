//! Server bootstrap and the broker task loop.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::{
    ui::handler::{get_rooms, health_check, websocket_handler},
    ui::signal::shutdown_signal,
    ui::state::{AppState, BrokerCommand, RoomSummaryDto},
    usecase::SessionBroker,
};

/// Top-level server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bind or accept failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the broker server on the given address until ctrl-c.
pub async fn run(addr: SocketAddr) -> Result<(), ServerError> {
    let (commands, command_rx) = mpsc::unbounded_channel();
    tokio::spawn(broker_loop(command_rx));

    let state = Arc::new(AppState { commands });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(get_rooms))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// The single broker task.
///
/// Owns the `SessionBroker` (and with it all room/session state) plus the
/// table of live connection senders. Commands are handled one at a time in
/// arrival order, which makes all registry mutation race-free.
async fn broker_loop(mut commands: mpsc::UnboundedReceiver<BrokerCommand>) {
    let mut broker = SessionBroker::new();
    let mut connections: HashMap<String, mpsc::UnboundedSender<Vec<u8>>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            BrokerCommand::Attach { client_id, sender } => {
                if connections.insert(client_id.clone(), sender).is_some() {
                    tracing::info!("Replaced live connection for '{client_id}'");
                }
            }
            BrokerCommand::Frame { client_id, bytes } => {
                for delivery in broker.handle_frame(&client_id, &bytes) {
                    let Some(connection) = connections.get(delivery.target.as_str()) else {
                        tracing::warn!(
                            "No live connection for '{}', dropping delivery",
                            delivery.target
                        );
                        continue;
                    };
                    if connection.send(delivery.envelope.encode()).is_err() {
                        tracing::warn!("Failed to send to client '{}'", delivery.target);
                    }
                }
            }
            BrokerCommand::Detach { client_id } => {
                connections.remove(&client_id);
            }
            BrokerCommand::Snapshot { reply } => {
                let mut summaries: Vec<RoomSummaryDto> = broker
                    .registry()
                    .rooms()
                    .map(|room| {
                        let mut members: Vec<String> = room
                            .members
                            .iter()
                            .map(|member| member.as_str().to_string())
                            .collect();
                        members.sort();
                        RoomSummaryDto {
                            id: room.id.as_str().to_string(),
                            members,
                            history_len: room.history.len(),
                            created_at: timestamp_to_rfc3339(room.created_at),
                        }
                    })
                    .collect();
                summaries.sort_by(|a, b| a.id.cmp(&b.id));
                let _ = reply.send(summaries);
            }
        }
    }
}
