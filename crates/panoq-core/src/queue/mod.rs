//! Request queue: FIFO intake, bounded concurrency, one settlement per request.
//!
//! # 構成
//! - `handle`: 呼び出し側が共有する `RequestQueue` と `ResponseFuture`
//! - `dispatcher`: FIFO を所有する単一タスク
//! - `record`: キュー内の 1 リクエスト（完了通知の oneshot を含む）

mod dispatcher;
mod handle;
mod record;

pub use handle::{DEFAULT_MAX_CONCURRENCY, RequestQueue, ResponseFuture};
