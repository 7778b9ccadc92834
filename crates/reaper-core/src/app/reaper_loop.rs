//! ReaperLoop - 長時間 session の定期回収
//!
//! # 状態
//! - Scanning: Sweeper::sweep() で全階層を走査・回収
//! - Idle: poll_interval だけ待機
//!
//! # 停止
//! - Scanning 中の shutdown 要求: 現在の sweep を最後まで終えてから停止
//! - Idle 中の shutdown 要求: 即座に停止
//! - `shutdown_tx` を drop した場合も停止
//! - 致命的エラー（認証）: Err で停止

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::status::{StatusPublisher, StatusSnapshot};
use super::sweep::Sweeper;
use crate::domain::{LoopState, LoopSummary, SweepError};

/// Periodic sweep driver. Build it with `ReaperBuilder`.
pub struct ReaperLoop {
    sweeper: Sweeper,
    poll_interval: Duration,
    max_sweeps: Option<u64>,
    status: StatusPublisher,
}

impl ReaperLoop {
    pub(crate) fn new(sweeper: Sweeper, poll_interval: Duration, max_sweeps: Option<u64>) -> Self {
        Self {
            sweeper,
            poll_interval,
            max_sweeps,
            status: StatusPublisher::new(),
        }
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    /// Run until shutdown, `max_sweeps`, or a fatal error.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<LoopSummary, SweepError> {
        let mut summary = LoopSummary::default();

        let result = loop {
            if *shutdown.borrow() {
                break Ok(summary);
            }

            self.status.set_state(LoopState::Scanning);
            match self.sweeper.sweep().await {
                Ok(report) => {
                    summary.record(&report);
                    self.status.record_sweep(&report);
                }
                Err(err) => {
                    error!(error = %err, "stopping reaper");
                    break Err(err);
                }
            }

            if self.max_sweeps.is_some_and(|max| summary.sweeps >= max) {
                break Ok(summary);
            }
            if *shutdown.borrow() {
                break Ok(summary);
            }

            self.status.set_state(LoopState::Idle);
            info!(
                poll_interval_secs = self.poll_interval.as_secs_f64(),
                "waiting for the next sweep"
            );
            if self.idle(&mut shutdown).await {
                break Ok(summary);
            }
        };

        self.status.set_state(LoopState::Stopped);
        if let Ok(summary) = &result {
            info!(sweeps = summary.sweeps, evicted = summary.evicted, "reaper stopped");
        }
        result
    }

    /// Sleep for `poll_interval`. Returns `true` if shutdown was requested.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.poll_interval);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        return true;
                    }
                }
            }
        }
    }

    /// Spawn the loop onto the tokio runtime.
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let status = self.status();
        let join = tokio::spawn(async move { self.run(shutdown_rx).await });
        ReaperHandle {
            shutdown_tx,
            status,
            join,
        }
    }
}

/// Handle to a spawned `ReaperLoop`.
/// - `request_shutdown()` で停止を要求（進行中の sweep は完了させる）
/// - `join()` で終了を待てる
pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    status: watch::Receiver<StatusSnapshot>,
    join: JoinHandle<Result<LoopSummary, SweepError>>,
}

impl ReaperHandle {
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already have stopped
        let _ = self.shutdown_tx.send(true);
    }

    pub fn status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    /// Wait for the loop to stop on its own (max_sweeps or fatal error).
    pub async fn join(self) -> Result<LoopSummary, SweepError> {
        let ReaperHandle {
            shutdown_tx, join, ..
        } = self;
        let result = join
            .await
            .map_err(|e| SweepError::TaskFailed(e.to_string()))?;
        drop(shutdown_tx);
        result
    }

    pub async fn shutdown_and_join(self) -> Result<LoopSummary, SweepError> {
        self.request_shutdown();
        self.join().await
    }
}
