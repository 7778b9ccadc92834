//! ReaperBuilder - ReaperLoop の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 依存（ControlPlane, Clock）の注入によるテスト容易性

use std::sync::Arc;

use super::reaper_loop::ReaperLoop;
use super::sweep::Sweeper;
use crate::config::{ConfigError, ReaperConfig};
use crate::domain::EvictionPolicy;
use crate::ports::{Clock, ControlPlane, SystemClock};

/// ReaperBuilder は ReaperLoop を構築
///
/// # 使用例
/// ```ignore
/// let reaper = ReaperBuilder::new(config)
///     .control_plane(Arc::new(rest))
///     .build()?;
/// let handle = reaper.spawn();
/// ```
///
/// # Fail-fast 設計
/// - build() 時に設定値（project, 閾値, 間隔）を検証
/// - ControlPlane が未設定なら ConfigError を返す
pub struct ReaperBuilder {
    config: ReaperConfig,
    control_plane: Option<Arc<dyn ControlPlane>>,
    clock: Arc<dyn Clock>,
    max_sweeps: Option<u64>,
}

impl ReaperBuilder {
    pub fn new(config: ReaperConfig) -> Self {
        Self {
            config,
            control_plane: None,
            clock: Arc::new(SystemClock),
            max_sweeps: None,
        }
    }

    pub fn control_plane(mut self, control_plane: Arc<dyn ControlPlane>) -> Self {
        self.control_plane = Some(control_plane);
        self
    }

    /// Defaults to `SystemClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stop after `n` sweeps (`1` is one-shot mode).
    pub fn max_sweeps(mut self, n: u64) -> Self {
        self.max_sweeps = Some(n);
        self
    }

    pub fn build(self) -> Result<ReaperLoop, ConfigError> {
        let project = self.config.project_id()?;
        let threshold = self.config.threshold()?;
        let poll_interval = self.config.poll_interval()?;
        if self.max_sweeps == Some(0) {
            return Err(ConfigError::NotPositive { field: "max_sweeps" });
        }
        let control_plane = self
            .control_plane
            .ok_or(ConfigError::MissingControlPlane)?;

        let sweeper = Sweeper::new(
            project,
            control_plane,
            self.clock,
            EvictionPolicy::new(threshold),
        );
        Ok(ReaperLoop::new(sweeper, poll_interval, self.max_sweeps))
    }
}
