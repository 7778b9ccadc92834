//! Ports - 抽象化レイヤー
//!
//! 外部システム（Spanner の管理 API、実時刻）へのインターフェースを定義し、
//! 実装の詳細を隠蔽します。

pub mod clock;
pub mod control_plane;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::control_plane::ControlPlane;
