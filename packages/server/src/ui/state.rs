//! Server state and broker task plumbing.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub client_id: String,
}

/// Commands serialized into the single broker task.
///
/// Every registry mutation flows through this channel, so request handling
/// is strictly one at a time in arrival order.
#[derive(Debug)]
pub enum BrokerCommand {
    /// A WebSocket connection came up for `client_id`; route outbound
    /// frames through `sender`.
    Attach {
        client_id: String,
        sender: mpsc::UnboundedSender<Vec<u8>>,
    },
    /// One raw frame received from `client_id`'s connection.
    Frame { client_id: String, bytes: Vec<u8> },
    /// The connection for `client_id` closed. Releases only the live
    /// sender; room membership is never cleaned up (no leave protocol).
    Detach { client_id: String },
    /// Snapshot of all rooms for the observability endpoint.
    Snapshot {
        reply: oneshot::Sender<Vec<RoomSummaryDto>>,
    },
}

/// Shared application state: the handle to the broker task.
#[derive(Debug, Clone)]
pub struct AppState {
    pub commands: mpsc::UnboundedSender<BrokerCommand>,
}

/// Room summary for the rooms list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub members: Vec<String>,
    pub history_len: usize,
    pub created_at: String, // ISO 8601
}
