//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **RestControlPlane**: Spanner REST v1（本番用）
//! - **InMemoryControlPlane**: テスト・開発用
//! - **TokenSource**: REST 呼び出しの認証

pub mod auth;
pub mod inmem;
pub mod rest;

// 主要な型を再エクスポート
pub use self::auth::{GcloudToken, TokenSource};
pub use self::inmem::InMemoryControlPlane;
pub use self::rest::{DEFAULT_ENDPOINT, RestControlPlane};
