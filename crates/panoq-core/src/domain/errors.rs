//! Errors - エラー型と分類
//!
//! - `TransportError`: 1 回のネットワーク呼び出しが完了しなかった
//! - `RequestError`: queue の future が返しうるエラー
//!
//! status >= 300 のレスポンスはエラーではありません（呼び出し側が status を見る）。

use thiserror::Error;

/// The underlying network call failed to complete.
///
/// `Clone` so scripted transports can replay the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Terminal error delivered through a queued request's future.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Transport failures exhausted the retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The queue stopped accepting work before this request got in.
    #[error("request queue is closed")]
    QueueClosed,
}
