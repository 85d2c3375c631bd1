//! WebSocket chat client for the Hiroba system.
//!
//! The core is the connection bridge: a background worker that owns the
//! single connection to the broker and decouples UI submissions (which must
//! never block on network I/O) from socket traffic.

pub mod bridge;
pub mod formatter;
mod runner;

pub use bridge::{BridgeError, ChatBridge, LineSink};
pub use runner::run_client;
