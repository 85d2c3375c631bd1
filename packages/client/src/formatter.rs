//! Rendering of server events into display lines.
//!
//! The UI only ever receives formatted text lines; all protocol knowledge
//! stays on this side of the boundary.

use hiroba_shared::protocol::{ServerEnvelope, ServerPayload};

/// Shown instead of the sender id for the local client's own past messages.
const LOCAL_MARKER: &str = "ME";

/// Shown when a rejection carries no reason.
const NO_REASON: &str = "no reason given";

/// Format one chat line, marking the local client's own messages.
pub fn format_chat_line(sender_id: &str, text: &str, local_id: &str) -> String {
    if sender_id == local_id {
        format!("[{LOCAL_MARKER}] {text}")
    } else {
        format!("[{sender_id}] {text}")
    }
}

/// Render a decoded server envelope into zero or more display lines.
///
/// An accepted join replays the room's history after the acceptance line.
pub fn render_event(envelope: &ServerEnvelope, local_id: &str) -> Vec<String> {
    match &envelope.payload {
        ServerPayload::ChatBroadcast(broadcast) => {
            vec![format_chat_line(&broadcast.sender_id, &broadcast.text, local_id)]
        }
        ServerPayload::JoinRoomResponse {
            accepted: true,
            history,
            ..
        } => {
            let mut lines = vec!["--- Joined room ---".to_string()];
            lines.extend(
                history
                    .iter()
                    .map(|entry| format_chat_line(&entry.sender_id, &entry.text, local_id)),
            );
            lines
        }
        ServerPayload::JoinRoomResponse {
            accepted: false,
            reason,
            ..
        } => {
            vec![format!(
                "--- Join rejected: {} ---",
                reason.as_deref().unwrap_or(NO_REASON)
            )]
        }
        ServerPayload::CreateRoomResponse {
            accepted: true, ..
        } => {
            vec!["--- Room created ---".to_string()]
        }
        ServerPayload::CreateRoomResponse {
            accepted: false,
            reason,
        } => {
            vec![format!(
                "--- Room creation rejected: {} ---",
                reason.as_deref().unwrap_or(NO_REASON)
            )]
        }
    }
}
