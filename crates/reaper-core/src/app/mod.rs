//! App - アプリケーション層
//!
//! ports を組み合わせて reaper のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ReaperBuilder**: 設定検証とワイヤリング
//! - **Sweeper**: 1 回分の走査（instance → database → session → 判定・削除）
//! - **ReaperLoop**: Scanning / Idle を繰り返す定期タスク
//! - **Status**: ループ状態と直近の sweep 結果

pub mod builder;
pub mod reaper_loop;
pub mod status;
pub mod sweep;

// 主要な型を再エクスポート
pub use self::builder::ReaperBuilder;
pub use self::reaper_loop::{ReaperHandle, ReaperLoop};
pub use self::status::StatusSnapshot;
pub use self::sweep::Sweeper;
