//! Test fixtures for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use hiroba_shared::protocol::{ClientEnvelope, ClientPayload, ServerEnvelope};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A broker server running on a background task for the duration of a test.
///
/// Each test uses its own port so the servers do not interfere.
pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    /// Start a server on `127.0.0.1:<port>` and wait until it accepts
    /// connections.
    pub async fn start(port: u16) -> Self {
        let addr: SocketAddr = format!("127.0.0.1:{port}")
            .parse()
            .expect("valid test address");

        tokio::spawn(async move {
            if let Err(e) = hiroba_server::run(addr).await {
                panic!("test server failed: {e}");
            }
        });

        for _ in 0..100 {
            if TcpStream::connect(addr).await.is_ok() {
                return Self { addr };
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("test server did not start on {addr}");
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, client_id: &str) -> String {
        format!("ws://{}/ws?client_id={client_id}", self.addr)
    }

    /// Open a WebSocket connection identified as `client_id`.
    pub async fn connect(&self, client_id: &str) -> WsStream {
        let (stream, _response) = connect_async(self.ws_url(client_id))
            .await
            .expect("Failed to open WebSocket connection");
        stream
    }
}

/// Send one encoded client envelope as a Binary frame.
pub async fn send_payload(stream: &mut WsStream, sender_id: &str, payload: ClientPayload) {
    let envelope = ClientEnvelope {
        sender_id: sender_id.to_string(),
        payload,
    };
    stream
        .send(Message::Binary(envelope.encode().into()))
        .await
        .expect("Failed to send frame");
}

/// Receive and decode the next server envelope, skipping control frames.
///
/// Panics if nothing arrives within five seconds.
pub async fn recv_envelope(stream: &mut WsStream) -> ServerEnvelope {
    let deadline = Duration::from_secs(5);
    loop {
        let message = tokio::time::timeout(deadline, stream.next())
            .await
            .expect("Timed out waiting for a server envelope")
            .expect("Connection closed while waiting for a server envelope")
            .expect("WebSocket error while waiting for a server envelope");

        let bytes = match message {
            Message::Binary(bytes) => bytes.to_vec(),
            Message::Text(text) => text.as_bytes().to_vec(),
            _ => continue,
        };
        return ServerEnvelope::decode(&bytes).expect("Failed to decode server envelope");
    }
}

/// Assert that no envelope arrives on `stream` within `wait`.
pub async fn assert_silent(stream: &mut WsStream, wait: Duration) {
    let result = tokio::time::timeout(wait, stream.next()).await;
    match result {
        Err(_) => {} // timeout: nothing arrived
        Ok(None) => {}
        Ok(Some(Ok(message))) => match message {
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("Expected silence, got {other:?}"),
        },
        Ok(Some(Err(e))) => panic!("WebSocket error while expecting silence: {e}"),
    }
}
