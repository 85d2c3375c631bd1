//! Connection bridge between the UI and the broker connection.
//!
//! The UI thread only enqueues outgoing envelopes and receives
//! `append_line` callbacks; the worker task is the sole owner of the
//! socket. The two sides share nothing but the internal FIFO, so a
//! `submit_chat` call can never block on network I/O.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use futures_util::{sink::SinkExt, stream::StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use hiroba_shared::protocol::{ClientEnvelope, ClientPayload, ServerEnvelope};

use crate::formatter::{format_chat_line, render_event};

/// How long one worker poll waits before re-checking the shutdown flag.
/// Bounds shutdown latency; an idle connection wakes up this often.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// The UI boundary: everything the bridge tells the front end goes through
/// this one callback.
pub trait LineSink: Send + Sync {
    fn append_line(&self, line: &str);
}

impl<F> LineSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn append_line(&self, line: &str) {
        self(line)
    }
}

/// Errors surfaced by the bridge API.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Initial WebSocket connection failed
    #[error("failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// Blank chat text is rejected before it reaches the queue
    #[error("chat text cannot be empty")]
    EmptyMessage,

    /// The worker task has stopped, nothing can be enqueued anymore
    #[error("bridge worker is not running")]
    Disconnected,
}

/// Client-side dual-channel bridge.
///
/// Owns the outgoing FIFO producer side and the worker handle. All three
/// UI-facing operations are synchronous: they encode, enqueue, echo a local
/// line, and return immediately regardless of the eventual server outcome.
pub struct ChatBridge {
    client_id: String,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    sink: Arc<dyn LineSink>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ChatBridge {
    /// Connect to the broker and spawn the bridge worker.
    pub async fn connect(
        server_addr: &str,
        client_id: &str,
        sink: impl LineSink + 'static,
    ) -> Result<Self, BridgeError> {
        let url = format!("ws://{server_addr}/ws?client_id={client_id}");
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|source| BridgeError::Connect { url, source })?;

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let sink: Arc<dyn LineSink> = Arc::new(sink);

        let worker = tokio::spawn(worker_loop(
            stream,
            outgoing_rx,
            sink.clone(),
            shutdown.clone(),
            client_id.to_string(),
        ));

        Ok(Self {
            client_id: client_id.to_string(),
            outgoing,
            sink,
            shutdown,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Post a chat message into the current room. Rejects blank text.
    pub fn submit_chat(&self, text: &str) -> Result<(), BridgeError> {
        if text.trim().is_empty() {
            return Err(BridgeError::EmptyMessage);
        }
        // Local echo, decoupled from the eventual server outcome. The
        // server never echoes a chat post back to its sender.
        self.sink
            .append_line(&format_chat_line(&self.client_id, text, &self.client_id));
        self.enqueue(ClientPayload::Chat {
            text: text.to_string(),
        })
    }

    /// Ask to join an existing room.
    pub fn request_join(&self, room_id: &str) -> Result<(), BridgeError> {
        self.sink
            .append_line(&format!("--- Requested join: {room_id} ---"));
        self.enqueue(ClientPayload::JoinRoom {
            room_id: room_id.to_string(),
        })
    }

    /// Ask to create a new room and become its first member.
    pub fn request_create_room(&self, room_id: &str) -> Result<(), BridgeError> {
        self.sink
            .append_line(&format!("--- Requested room creation: {room_id} ---"));
        self.enqueue(ClientPayload::CreateRoom {
            room_id: room_id.to_string(),
        })
    }

    /// Stop the worker and wait for its current poll cycle to observe the
    /// flag. Latency is bounded by the poll interval.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let worker = self
            .worker
            .lock()
            .ok()
            .and_then(|mut handle| handle.take());
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::warn!("Bridge worker ended abnormally: {e}");
        }
    }

    fn enqueue(&self, payload: ClientPayload) -> Result<(), BridgeError> {
        let envelope = ClientEnvelope {
            sender_id: self.client_id.clone(),
            payload,
        };
        self.outgoing
            .send(envelope.encode())
            .map_err(|_| BridgeError::Disconnected)
    }

    /// Build a bridge with no live connection; the receiver side of the
    /// FIFO is handed back for inspection.
    #[cfg(test)]
    fn detached(
        client_id: &str,
        sink: Arc<dyn LineSink>,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        (
            Self {
                client_id: client_id.to_string(),
                outgoing,
                sink,
                shutdown: Arc::new(AtomicBool::new(false)),
                worker: Mutex::new(None),
            },
            outgoing_rx,
        )
    }
}

/// The bridge worker: sole owner of the connection.
///
/// Multiplexes the internal FIFO with inbound server traffic; the timeout
/// arm exists only so the shutdown flag is observed promptly when both
/// sources are idle. An in-flight send or decode always completes before
/// the flag is checked.
async fn worker_loop(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    sink: Arc<dyn LineSink>,
    shutdown: Arc<AtomicBool>,
    local_id: String,
) {
    let (mut ws_sink, mut ws_stream) = stream.split();
    tracing::debug!("Bridge worker started");

    loop {
        tokio::select! {
            queued = outgoing.recv() => match queued {
                Some(bytes) => {
                    // Already encoded by the UI-facing operation.
                    if let Err(e) = ws_sink.send(Message::Binary(bytes.into())).await {
                        tracing::warn!("Failed to send frame to server: {e}");
                    }
                }
                None => {
                    tracing::debug!("Outgoing channel closed");
                    break;
                }
            },
            incoming = ws_stream.next() => match incoming {
                Some(Ok(message)) => handle_server_message(message, &local_id, &sink),
                Some(Err(e)) => {
                    // Abort only this receive cycle, the loop continues.
                    tracing::warn!("WebSocket error: {e}");
                }
                None => {
                    tracing::info!("Server closed the connection");
                    break;
                }
            },
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
    }

    let _ = ws_sink.close().await;
    tracing::debug!("Bridge worker stopped");
}

/// Decode one inbound frame and dispatch it to the UI callback.
///
/// Malformed server input is logged and produces no UI line; it must never
/// crash the worker.
fn handle_server_message(message: Message, local_id: &str, sink: &Arc<dyn LineSink>) {
    let bytes = match message {
        Message::Binary(bytes) => bytes.to_vec(),
        Message::Text(text) => text.as_bytes().to_vec(),
        Message::Close(_) => {
            tracing::info!("Server sent close frame");
            return;
        }
        // Ping/pong is handled by the protocol layer.
        _ => return,
    };

    match ServerEnvelope::decode(&bytes) {
        Ok(envelope) => {
            for line in render_event(&envelope, local_id) {
                sink.append_line(&line);
            }
        }
        Err(e) => {
            tracing::warn!("Failed to decode server envelope: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiroba_shared::protocol::{ChatBroadcast, ServerPayload};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - UI 向け操作（submit_chat / request_join / request_create_room）の
    //   バリデーション、ローカルエコー、FIFO への投入
    // - サーバメッセージのディスパッチ（不正フレームは UI に届かない）
    //
    // 【なぜこのテストが必要か】
    // - ブリッジは UI スレッドとネットワークの唯一の境界であり、
    //   エンキューが非ブロッキングでエコーが同期的であることを保証する
    // ========================================

    #[derive(Default)]
    struct CollectingSink {
        lines: Mutex<Vec<String>>,
    }

    impl CollectingSink {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LineSink for CollectingSink {
        fn append_line(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }

    fn detached_bridge() -> (
        ChatBridge,
        Arc<CollectingSink>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let sink = Arc::new(CollectingSink::default());
        let (bridge, rx) = ChatBridge::detached("alice", sink.clone());
        (bridge, sink, rx)
    }

    #[test]
    fn test_submit_chat_rejects_blank_text() {
        // テスト項目: 空白のみのチャットは拒否され、何もエンキューされない
        // given (前提条件):
        let (bridge, sink, mut rx) = detached_bridge();

        // when (操作):
        let result = bridge.submit_chat("   ");

        // then (期待する結果):
        assert!(matches!(result, Err(BridgeError::EmptyMessage)));
        assert!(sink.lines().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_submit_chat_echoes_and_enqueues() {
        // テスト項目: チャット送信は [ME] エコーと Chat エンベロープの
        //             エンキューを同期的に行う
        // given (前提条件):
        let (bridge, sink, mut rx) = detached_bridge();

        // when (操作):
        bridge.submit_chat("hello").unwrap();

        // then (期待する結果):
        assert_eq!(sink.lines(), vec!["[ME] hello".to_string()]);
        let bytes = rx.try_recv().unwrap();
        let envelope = ClientEnvelope::decode(&bytes).unwrap();
        assert_eq!(envelope.sender_id, "alice");
        assert_eq!(
            envelope.payload,
            ClientPayload::Chat {
                text: "hello".to_string(),
            }
        );
    }

    #[test]
    fn test_request_join_echoes_and_enqueues() {
        // テスト項目: 参加要求はローカルエコーと JoinRoom エンベロープの
        //             エンキューを行う
        // given (前提条件):
        let (bridge, sink, mut rx) = detached_bridge();

        // when (操作):
        bridge.request_join("general").unwrap();

        // then (期待する結果):
        assert_eq!(
            sink.lines(),
            vec!["--- Requested join: general ---".to_string()]
        );
        let envelope = ClientEnvelope::decode(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            envelope.payload,
            ClientPayload::JoinRoom {
                room_id: "general".to_string(),
            }
        );
    }

    #[test]
    fn test_request_create_room_echoes_and_enqueues() {
        // テスト項目: 作成要求はローカルエコーと CreateRoom エンベロープの
        //             エンキューを行う
        // given (前提条件):
        let (bridge, sink, mut rx) = detached_bridge();

        // when (操作):
        bridge.request_create_room("general").unwrap();

        // then (期待する結果):
        assert_eq!(
            sink.lines(),
            vec!["--- Requested room creation: general ---".to_string()]
        );
        let envelope = ClientEnvelope::decode(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            envelope.payload,
            ClientPayload::CreateRoom {
                room_id: "general".to_string(),
            }
        );
    }

    #[test]
    fn test_enqueue_after_worker_gone_fails() {
        // テスト項目: ワーカー消滅後（受信側ドロップ後）のエンキューは
        //             Disconnected エラーになる
        // given (前提条件):
        let (bridge, _sink, rx) = detached_bridge();
        drop(rx);

        // when (操作):
        let result = bridge.request_join("general");

        // then (期待する結果):
        assert!(matches!(result, Err(BridgeError::Disconnected)));
    }

    #[test]
    fn test_handle_server_message_dispatches_broadcast() {
        // テスト項目: 受信した ChatBroadcast が整形されて UI に届く
        // given (前提条件):
        let sink = Arc::new(CollectingSink::default());
        let dyn_sink: Arc<dyn LineSink> = sink.clone();
        let frame = ServerEnvelope {
            payload: ServerPayload::ChatBroadcast(ChatBroadcast {
                sender_id: "A".to_string(),
                text: "hi B".to_string(),
            }),
        }
        .encode();

        // when (操作):
        handle_server_message(Message::Binary(frame.into()), "B", &dyn_sink);

        // then (期待する結果):
        assert_eq!(sink.lines(), vec!["[A] hi B".to_string()]);
    }

    #[test]
    fn test_handle_server_message_drops_malformed_frame() {
        // テスト項目: 不正なフレームは UI 行を生まない（ログのみ）
        // given (前提条件):
        let sink = Arc::new(CollectingSink::default());
        let dyn_sink: Arc<dyn LineSink> = sink.clone();

        // when (操作):
        handle_server_message(
            Message::Binary(vec![0xff, 0x00, 0x42].into()),
            "B",
            &dyn_sink,
        );

        // then (期待する結果):
        assert!(sink.lines().is_empty());
    }
}
