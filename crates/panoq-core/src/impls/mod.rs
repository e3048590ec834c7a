//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ReqwestTransport**: 本番用の HTTP Transport
//! - **ScriptedTransport**: テスト・デモ用（応答を決め打ちで返す）

pub mod reqwest_transport;
pub mod scripted;

pub use self::reqwest_transport::ReqwestTransport;
pub use self::scripted::{RecordedCall, ScriptedStep, ScriptedTransport};
