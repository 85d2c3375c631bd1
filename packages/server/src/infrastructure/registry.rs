//! インメモリ Room Registry 実装
//!
//! ルームとクライアントセッションの状態を HashMap で保持します。
//!
//! メンバーシップの信頼できる唯一の情報源は `sessions`（クライアント →
//! 現在のルーム）で、各ルームのメンバー集合はそこから導出される逆引き
//! インデックスです。両者の整合性は単一の変更関数 `assign` だけが保証
//! します（「古いルームから削除してから新しいルームに追加する」処理を
//! 2 つのコレクションに分散させない）。
//!
//! プロトコルに切断・退室メッセージは存在しないため、一度登録された
//! クライアントとそのメンバーシップが削除されることはありません。

use std::collections::{HashMap, HashSet};

use crate::domain::{ChatMessage, ClientId, RegistryError, Room, RoomId};

/// In-memory room and session tables.
///
/// Owned exclusively by the broker task; all access is synchronous and
/// single-threaded, so no locking is needed.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// client → current room (None = known but roomless). Presence in this
    /// map is what makes a client "known".
    sessions: HashMap<ClientId, Option<RoomId>>,
    /// room → room state. Member sets are derived from `sessions`.
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client with no room. Idempotent: an already-known client
    /// keeps its current membership.
    pub fn register_client(&mut self, client: ClientId) {
        self.sessions.entry(client).or_insert(None);
    }

    /// Whether the client has ever been registered.
    pub fn is_known(&self, client: &ClientId) -> bool {
        self.sessions.contains_key(client)
    }

    /// The client's current room, if any.
    pub fn current_room(&self, client: &ClientId) -> Option<&RoomId> {
        self.sessions.get(client).and_then(|room| room.as_ref())
    }

    /// Create an empty room.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyExists` if the room id is taken.
    pub fn create_room(&mut self, room_id: RoomId, created_at: i64) -> Result<(), RegistryError> {
        if self.rooms.contains_key(&room_id) {
            return Err(RegistryError::AlreadyExists(room_id.into_string()));
        }
        self.rooms
            .insert(room_id.clone(), Room::new(room_id, created_at));
        Ok(())
    }

    /// Whether the room id is registered.
    pub fn room_exists(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Add a client to a room. Idempotent; a client belongs to at most one
    /// room at a time, so any previous membership is moved, not duplicated.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownRoom` if the room does not exist.
    pub fn add_member(&mut self, room_id: &RoomId, client: &ClientId) -> Result<(), RegistryError> {
        if !self.room_exists(room_id) {
            return Err(RegistryError::UnknownRoom(room_id.as_str().to_string()));
        }
        self.assign(client, Some(room_id.clone()));
        Ok(())
    }

    /// Remove a client from a room. No-op if the client is not a member.
    pub fn remove_member(&mut self, room_id: &RoomId, client: &ClientId) {
        if self.current_room(client) == Some(room_id) {
            self.assign(client, None);
        }
    }

    /// Append a message to the room's ordered chat log. Unbounded.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownRoom` if the room does not exist.
    pub fn append_history(
        &mut self,
        room_id: &RoomId,
        message: ChatMessage,
    ) -> Result<(), RegistryError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::UnknownRoom(room_id.as_str().to_string()))?;
        room.history.push(message);
        Ok(())
    }

    /// The room's members except the given client. Used for broadcast
    /// fan-out.
    pub fn members_excluding(&self, room_id: &RoomId, client: &ClientId) -> HashSet<ClientId> {
        match self.rooms.get(room_id) {
            Some(room) => room
                .members
                .iter()
                .filter(|member| *member != client)
                .cloned()
                .collect(),
            None => HashSet::new(),
        }
    }

    /// The room's chat history in post order. Empty for unknown rooms.
    pub fn history_of(&self, room_id: &RoomId) -> &[ChatMessage] {
        self.rooms
            .get(room_id)
            .map(|room| room.history.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over all rooms (observability endpoint).
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// The single mutation point for membership. Updates the client's
    /// session entry and keeps the derived member sets consistent with it.
    fn assign(&mut self, client: &ClientId, target: Option<RoomId>) {
        let previous = self
            .sessions
            .insert(client.clone(), target.clone())
            .flatten();

        if let Some(prev) = previous
            && Some(&prev) != target.as_ref()
            && let Some(room) = self.rooms.get_mut(&prev)
        {
            room.members.remove(client);
        }

        if let Some(room_id) = target
            && let Some(room) = self.rooms.get_mut(&room_id)
        {
            room.members.insert(client.clone());
        }
    }
}
