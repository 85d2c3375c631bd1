//! WebSocket/HTTP transport layer for the broker.

mod handler;
mod runner;
mod signal;
pub mod state; // テストおよびハンドラからアクセスするため public

pub use runner::{ServerError, run};
