//! インフラストラクチャ層
//!
//! ルームとセッションのインメモリ状態を提供します。
//! ブローカー（usecase 層）が唯一の所有者であり、ここにロックはありません。

pub mod registry;

pub use registry::RoomRegistry;
