//! Domain layer for the chat broker.
//!
//! This module contains business types that are independent of the wire
//! format and the transport layer.

pub mod entity;
pub mod error;
pub mod value_object;

pub use entity::{ChatMessage, Room};
pub use error::{RegistryError, ValueObjectError};
pub use value_object::{ClientId, MessageContent, RoomId};
