//! Core domain models for the chat broker.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::value_object::{ClientId, MessageContent, RoomId};

/// A named broadcast domain with membership and ordered chat history.
///
/// History grows without bound: there is deliberately no eviction, and no
/// leave protocol removes members (see the registry docs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier (user-chosen name)
    pub id: RoomId,
    /// Clients currently joined to this room
    pub members: HashSet<ClientId>,
    /// Ordered chat history, oldest first
    pub history: Vec<ChatMessage>,
    /// Unix timestamp (milliseconds) when the room was created
    pub created_at: i64,
}

impl Room {
    /// Create a new empty room with the given ID and creation timestamp
    pub fn new(id: RoomId, created_at: i64) -> Self {
        Self {
            id,
            members: HashSet::new(),
            history: Vec::new(),
            created_at,
        }
    }
}

/// One chat message in a room's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender's client id
    pub from: ClientId,
    /// Message text
    pub content: MessageContent,
    /// Unix timestamp (milliseconds) when the broker accepted the message
    pub timestamp: i64,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(from: ClientId, content: MessageContent, timestamp: i64) -> Self {
        Self {
            from,
            content,
            timestamp,
        }
    }
}
