//! panoq-core
//!
//! Outbound request governor for the panorama gallery client.
//!
//! Pipeline: caller -> [`queue::RequestQueue`] -> [`retry::RetryExecutor`] -> [`ports::Transport`].
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, response, outcome, state, errors）
//! - **ports**: 抽象化レイヤー（Transport, Clock, IdGenerator）
//! - **impls**: 実装（ReqwestTransport, 開発用の ScriptedTransport）
//! - **retry**: バックオフ付きリトライ
//! - **queue**: FIFO + 同時実行数制限のリクエストキュー
//! - **api**: ギャラリー GraphQL クライアント
//! - **config** / **logging** / **observability**: 設定・ログ・診断

pub mod api;
pub mod config;
pub mod domain;
pub mod impls;
pub mod logging;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod retry;

pub use api::{ApiError, GalleryClient};
pub use config::{ConfigError, GovernorConfig};
pub use domain::{ApiRequest, ApiResponse, RequestError, RequestOptions, TransportError};
pub use queue::{RequestQueue, ResponseFuture};
pub use retry::{RetryExecutor, RetryPolicy};
