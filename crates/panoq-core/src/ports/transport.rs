//! Transport port - 1 回の生のネットワーク呼び出し
//!
//! Retry も queue も知らない一番下の層です。
//! 失敗は `Err(TransportError)`、届いたレスポンスは status に関係なく `Ok`。
//!
//! # 実装
//! - `impls::ReqwestTransport`（本番用）
//! - `impls::ScriptedTransport`（テスト・デモ用）

use async_trait::async_trait;

use crate::domain::{ApiRequest, ApiResponse, TransportError};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
