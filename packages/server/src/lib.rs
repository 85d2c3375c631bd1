//! Room/session broker server for the Hiroba chat system.
//!
//! Clients connect over WebSocket, join or create named rooms, exchange text
//! messages, and receive room history on join. All room and session state is
//! owned by a single broker task, so request handling is strictly serialized
//! in arrival order.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use ui::run;
