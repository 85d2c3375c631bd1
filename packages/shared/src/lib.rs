//! Shared library for the Hiroba chat system.
//!
//! The server and the client both link this crate; `protocol` is the single
//! bit-compatibility authority for the wire format, so the two sides can
//! never diverge on encoding.

pub mod logger;
pub mod protocol;
pub mod time;
