//! UseCase: セッションブローカー（リクエスト処理ステートマシン）
//!
//! (既知クライアント) × (ルーム) の 2 つのテーブル上のステートマシン。
//! 明示的な状態はなく、挙動はリクエストの種類と現在のメンバーシップ
//! だけで決まります。
//!
//! リクエストは到着順に 1 件ずつ処理されます（並べ替え・バッチ処理なし）。
//! そのため「ルームは既に存在するか」のチェックは構造的に競合しません。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SessionBroker::handle_frame() のディスパッチ全体
//! - 参加・作成・チャットの正常系と全ての拒否パス
//!
//! ### なぜこのテストが必要か
//! - ブローカーはサーバ側の中核であり、観測可能な副作用（ユニキャスト
//!   応答、ファンアウト、履歴の増加）が仕様通りであることを保証する
//! - 不正なバイト列や偽装された送信者 ID がループを停止させないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム作成 → 投稿 → 参加（履歴再生）→ ブロードキャスト
//! - 異常系：重複作成、存在しないルームへの参加、同一ルームへの再参加
//! - エッジケース：未登録クライアントからのチャット、送信者 ID 偽装

use hiroba_shared::protocol::{
    ChatBroadcast, ClientEnvelope, ClientPayload, ServerEnvelope, ServerPayload,
};
use hiroba_shared::time::current_timestamp;

use crate::domain::{ChatMessage, ClientId, MessageContent, RoomId};
use crate::infrastructure::RoomRegistry;

/// One outgoing message the transport layer must deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport routing identity of the recipient
    pub target: ClientId,
    /// Envelope to encode and send
    pub envelope: ServerEnvelope,
}

impl Delivery {
    fn unicast(target: ClientId, payload: ServerPayload) -> Self {
        Self {
            target,
            envelope: ServerEnvelope { payload },
        }
    }
}

/// The server-side request-handling state machine.
///
/// Owns the room/session registry exclusively. One frame in, zero or more
/// deliveries out; no frame ever aborts the broker.
#[derive(Debug, Default)]
pub struct SessionBroker {
    registry: RoomRegistry,
}

impl SessionBroker {
    /// Create a broker with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the registry (observability endpoints).
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Handle one raw frame received from `transport_id`.
    ///
    /// Decoding failures and identity spoofing are logged and dropped;
    /// validation failures are answered with explicit negative responses.
    pub fn handle_frame(&mut self, transport_id: &str, bytes: &[u8]) -> Vec<Delivery> {
        let envelope = match ClientEnvelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Failed to decode client envelope from '{transport_id}': {e}");
                return Vec::new();
            }
        };

        // Anti-spoofing: the self-declared sender must match the transport
        // routing identity.
        if envelope.sender_id != transport_id {
            tracing::warn!(
                "Sender ID '{}' does not match transport identity '{transport_id}', dropping",
                envelope.sender_id
            );
            return Vec::new();
        }

        let sender = match ClientId::new(envelope.sender_id) {
            Ok(sender) => sender,
            Err(e) => {
                tracing::warn!("Invalid sender id from '{transport_id}': {e}");
                return Vec::new();
            }
        };

        match envelope.payload {
            ClientPayload::JoinRoom { room_id } => self.handle_join(sender, room_id),
            ClientPayload::CreateRoom { room_id } => self.handle_create(sender, room_id),
            ClientPayload::Chat { text } => self.handle_chat(sender, text),
        }
    }

    /// A client is valid for chatting when it is known and currently
    /// assigned a room that still exists.
    fn is_client_valid(&self, client: &ClientId) -> bool {
        match self.registry.current_room(client) {
            Some(room_id) => self.registry.room_exists(room_id),
            None => false,
        }
    }

    fn handle_join(&mut self, sender: ClientId, room_id: String) -> Vec<Delivery> {
        // First contact registers the client, roomless.
        self.registry.register_client(sender.clone());

        let room_id = match RoomId::new(room_id) {
            Ok(room_id) => room_id,
            Err(_) => return vec![Self::join_rejected(sender, "Invalid room ID")],
        };

        if !self.registry.room_exists(&room_id) {
            tracing::info!("Client '{sender}' tried to join unknown room '{room_id}'");
            return vec![Self::join_rejected(sender, "Invalid room ID")];
        }

        // Re-join of the same room is rejected; switching rooms is allowed
        // and moves membership.
        if self.registry.current_room(&sender) == Some(&room_id) {
            tracing::info!("Client '{sender}' is already in room '{room_id}'");
            return vec![Self::join_rejected(sender, "Already in room")];
        }

        if let Err(e) = self.registry.add_member(&room_id, &sender) {
            tracing::warn!("Failed to add '{sender}' to room '{room_id}': {e}");
            return vec![Self::join_rejected(sender, "Invalid room ID")];
        }

        let history = self
            .registry
            .history_of(&room_id)
            .iter()
            .map(|message| ChatBroadcast {
                sender_id: message.from.as_str().to_string(),
                text: message.content.as_str().to_string(),
            })
            .collect();

        tracing::info!("Client '{sender}' joined room '{room_id}'");
        vec![Delivery::unicast(
            sender,
            ServerPayload::JoinRoomResponse {
                accepted: true,
                reason: None,
                history,
            },
        )]
    }

    fn handle_create(&mut self, sender: ClientId, room_id: String) -> Vec<Delivery> {
        let room_id = match RoomId::new(room_id) {
            Ok(room_id) => room_id,
            Err(_) => return vec![Self::create_rejected(sender, "Invalid room ID")],
        };

        if self.registry.room_exists(&room_id) {
            tracing::info!("Client '{sender}' tried to create existing room '{room_id}'");
            return vec![Self::create_rejected(sender, "Room already exists")];
        }

        self.registry.register_client(sender.clone());
        if let Err(e) = self.registry.create_room(room_id.clone(), current_timestamp()) {
            // Unreachable after the exists check above; answered anyway so
            // the requester is never left waiting.
            tracing::warn!("Failed to create room '{room_id}': {e}");
            return vec![Self::create_rejected(sender, "Room already exists")];
        }
        if let Err(e) = self.registry.add_member(&room_id, &sender) {
            tracing::warn!("Failed to add creator '{sender}' to room '{room_id}': {e}");
        }

        tracing::info!("Client '{sender}' created room '{room_id}'");
        vec![Delivery::unicast(
            sender,
            ServerPayload::CreateRoomResponse {
                accepted: true,
                reason: None,
            },
        )]
    }

    fn handle_chat(&mut self, sender: ClientId, text: String) -> Vec<Delivery> {
        // Fire-and-forget: invalid senders get no feedback, only a log line.
        if !self.is_client_valid(&sender) {
            tracing::warn!("Dropping chat from unknown or roomless client '{sender}'");
            return Vec::new();
        }

        let content = match MessageContent::new(text) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Dropping chat with invalid content from '{sender}': {e}");
                return Vec::new();
            }
        };

        let room_id = match self.registry.current_room(&sender) {
            Some(room_id) => room_id.clone(),
            // Already covered by is_client_valid.
            None => return Vec::new(),
        };

        let broadcast = ChatBroadcast {
            sender_id: sender.as_str().to_string(),
            text: content.as_str().to_string(),
        };

        if let Err(e) = self.registry.append_history(
            &room_id,
            ChatMessage::new(sender.clone(), content, current_timestamp()),
        ) {
            tracing::warn!("Failed to append history in room '{room_id}': {e}");
            return Vec::new();
        }

        tracing::info!("Chat in room '{room_id}': [{sender}] {}", broadcast.text);

        self.registry
            .members_excluding(&room_id, &sender)
            .into_iter()
            .map(|member| {
                Delivery::unicast(member, ServerPayload::ChatBroadcast(broadcast.clone()))
            })
            .collect()
    }

    fn join_rejected(target: ClientId, reason: &str) -> Delivery {
        Delivery::unicast(
            target,
            ServerPayload::JoinRoomResponse {
                accepted: false,
                reason: Some(reason.to_string()),
                history: Vec::new(),
            },
        )
    }

    fn create_rejected(target: ClientId, reason: &str) -> Delivery {
        Delivery::unicast(
            target,
            ServerPayload::CreateRoomResponse {
                accepted: false,
                reason: Some(reason.to_string()),
            },
        )
    }
}
