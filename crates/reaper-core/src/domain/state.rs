//! State - ReaperLoop の状態
//!
//! # 状態遷移
//! - starting → scanning: ループ開始
//! - scanning → idle: sweep 完了（evict の有無に関係なく）
//! - idle → scanning: poll_interval 経過
//! - scanning/idle → stopped: shutdown 要求・max_sweeps 到達・致命的エラー

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Starting,
    Scanning,
    Idle,
    Stopped,
}

impl LoopState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, LoopState::Stopped)
    }
}
