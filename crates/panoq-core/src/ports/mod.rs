//! Ports - 抽象化レイヤー
//!
//! 外部（ネットワーク、時刻、ID 生成）へのインターフェースです。
//! 実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::transport::Transport;
