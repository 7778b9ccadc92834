//! reaper-core
//!
//! Core building blocks for a long-running session reaper on Cloud Spanner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（names, entities, policy, report, state, errors）
//! - **ports**: 抽象化レイヤー（ControlPlane, Clock）
//! - **impls**: 実装（RestControlPlane, InMemoryControlPlane, TokenSource）
//! - **app**: アプリケーションロジック（builder, sweep, reaper_loop, status）
//! - **config**: 設定値と検証
//! - **observability**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{ReaperBuilder, ReaperHandle, ReaperLoop, StatusSnapshot, Sweeper};
pub use config::{ConfigError, ReaperConfig};
pub use domain::{ControlPlaneError, LoopState, LoopSummary, SweepError, SweepReport};
pub use observability::{LogError, LogFormat, init_tracing};
