//! Wire protocol codec.
//!
//! Defines the two tagged-variant envelopes exchanged between client and
//! server, and their (de)serialization. Both sides must use these exact
//! types: one WebSocket Binary frame carries exactly one encoded envelope.
//!
//! Payload variants are closed sum types, so every dispatch site matches
//! exhaustively and adding a variant is a compile error until both sides
//! handle it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when an incoming byte buffer cannot be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Truncated input, invalid JSON, unknown payload tag, or missing field.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A message originated by a client.
///
/// `sender_id` repeats the client's self-declared identity. The server
/// verifies it against the transport-level routing identity before acting on
/// the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub sender_id: String,
    pub payload: ClientPayload,
}

/// Client-originated payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientPayload {
    /// Join an existing room. Never creates the room.
    JoinRoom { room_id: String },
    /// Create a new room and become its first member.
    CreateRoom { room_id: String },
    /// Post a chat message into the sender's current room.
    Chat { text: String },
}

/// A message originated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub payload: ServerPayload,
}

/// Server-originated payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerPayload {
    /// A chat message fanned out to the other members of a room.
    ChatBroadcast(ChatBroadcast),
    /// Unicast answer to a `JoinRoom` request. On acceptance, `history`
    /// replays the room's full chat log in post order.
    JoinRoomResponse {
        accepted: bool,
        reason: Option<String>,
        history: Vec<ChatBroadcast>,
    },
    /// Unicast answer to a `CreateRoom` request.
    CreateRoomResponse {
        accepted: bool,
        reason: Option<String>,
    },
}

/// One chat line: sender identity plus text. Used both as a live broadcast
/// and as a history element in `JoinRoomResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatBroadcast {
    pub sender_id: String,
    pub text: String,
}

impl ClientEnvelope {
    /// Encode this envelope into a byte buffer.
    ///
    /// Serialization of a closed, string-only message type cannot fail for
    /// well-formed in-memory values.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("client envelope serialization is infallible")
    }

    /// Decode one envelope from a byte buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl ServerEnvelope {
    /// Encode this envelope into a byte buffer.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("server envelope serialization is infallible")
    }

    /// Decode one envelope from a byte buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 全ペイロードバリアントのエンコード・デコードのラウンドトリップ
    // - 不正なバイト列（切り詰め、未知のタグ、非 JSON）の拒否
    //
    // 【なぜこのテストが必要か】
    // - codec はクライアント・サーバ間のビット互換性の唯一の基準
    // - 不正入力でプロセスが落ちないことを保証する必要がある
    // ========================================

    #[test]
    fn test_client_envelope_join_room_roundtrip() {
        // テスト項目: JoinRoom ペイロードのラウンドトリップ
        // given (前提条件):
        let envelope = ClientEnvelope {
            sender_id: "alice".to_string(),
            payload: ClientPayload::JoinRoom {
                room_id: "general".to_string(),
            },
        };

        // when (操作):
        let decoded = ClientEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_client_envelope_create_room_roundtrip() {
        // テスト項目: CreateRoom ペイロードのラウンドトリップ
        // given (前提条件):
        let envelope = ClientEnvelope {
            sender_id: "bob".to_string(),
            payload: ClientPayload::CreateRoom {
                room_id: "random".to_string(),
            },
        };

        // when (操作):
        let decoded = ClientEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_client_envelope_chat_roundtrip() {
        // テスト項目: Chat ペイロードのラウンドトリップ
        // given (前提条件):
        let envelope = ClientEnvelope {
            sender_id: "alice".to_string(),
            payload: ClientPayload::Chat {
                text: "hello, world".to_string(),
            },
        };

        // when (操作):
        let decoded = ClientEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_server_envelope_chat_broadcast_roundtrip() {
        // テスト項目: ChatBroadcast ペイロードのラウンドトリップ
        // given (前提条件):
        let envelope = ServerEnvelope {
            payload: ServerPayload::ChatBroadcast(ChatBroadcast {
                sender_id: "alice".to_string(),
                text: "hi".to_string(),
            }),
        };

        // when (操作):
        let decoded = ServerEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_server_envelope_join_response_roundtrip() {
        // テスト項目: JoinRoomResponse ペイロード（履歴付き）のラウンドトリップ
        // given (前提条件):
        let envelope = ServerEnvelope {
            payload: ServerPayload::JoinRoomResponse {
                accepted: true,
                reason: None,
                history: vec![
                    ChatBroadcast {
                        sender_id: "alice".to_string(),
                        text: "first".to_string(),
                    },
                    ChatBroadcast {
                        sender_id: "bob".to_string(),
                        text: "second".to_string(),
                    },
                ],
            },
        };

        // when (操作):
        let decoded = ServerEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_server_envelope_join_response_rejected_roundtrip() {
        // テスト項目: 拒否された JoinRoomResponse（reason 付き）のラウンドトリップ
        // given (前提条件):
        let envelope = ServerEnvelope {
            payload: ServerPayload::JoinRoomResponse {
                accepted: false,
                reason: Some("Invalid room ID".to_string()),
                history: Vec::new(),
            },
        };

        // when (操作):
        let decoded = ServerEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_server_envelope_create_response_roundtrip() {
        // テスト項目: CreateRoomResponse ペイロードのラウンドトリップ
        // given (前提条件):
        let envelope = ServerEnvelope {
            payload: ServerPayload::CreateRoomResponse {
                accepted: false,
                reason: Some("Room already exists".to_string()),
            },
        };

        // when (操作):
        let decoded = ServerEnvelope::decode(&envelope.encode()).unwrap();

        // then (期待する結果):
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        // テスト項目: 切り詰められたバイト列はエラーになり、パニックしない
        // given (前提条件):
        let bytes = ClientEnvelope {
            sender_id: "alice".to_string(),
            payload: ClientPayload::Chat {
                text: "hello".to_string(),
            },
        }
        .encode();
        let truncated = &bytes[..bytes.len() / 2];

        // when (操作):
        let result = ClientEnvelope::decode(truncated);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        // テスト項目: 未知のペイロードタグはエラーになる
        // given (前提条件):
        let bytes = br#"{"sender_id":"alice","payload":{"type":"self-destruct"}}"#;

        // when (操作):
        let result = ClientEnvelope::decode(bytes);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_non_json_garbage() {
        // テスト項目: JSON ですらないバイト列はエラーになる
        // given (前提条件):
        let bytes = [0xff, 0x00, 0x13, 0x37];

        // when (操作):
        let result = ServerEnvelope::decode(&bytes);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        // テスト項目: 必須フィールドが欠けたペイロードはエラーになる
        // given (前提条件):
        let bytes = br#"{"sender_id":"alice","payload":{"type":"join-room"}}"#;

        // when (操作):
        let result = ClientEnvelope::decode(bytes);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
