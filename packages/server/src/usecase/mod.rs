//! UseCase 層
//!
//! プロトコルメッセージを検証・ルーティングするビジネスロジックを実装する
//! レイヤー。UI 層（トランスポート）から呼び出され、インフラ層の Registry
//! を操作します。
//!
//! ブローカーは送信処理を行わず、配送指示（`Delivery`）のリストを返すだけ
//! です。実際のソケット送信は UI 層の責務です。

pub mod broker;

pub use broker::{Delivery, SessionBroker};
