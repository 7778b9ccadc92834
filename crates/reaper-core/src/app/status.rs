//! Status - ReaperLoop の現在状態
//!
//! ループは watch channel で StatusSnapshot を公開し、
//! ReaperHandle::status() から購読できます。

use serde::Serialize;
use tokio::sync::watch;

use crate::domain::{LoopState, SweepReport};

/// Status は「いま何をしているか」と直近の sweep 結果を説明
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: LoopState,
    pub sweeps: u64,
    pub last_report: Option<SweepReport>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: LoopState::Starting,
            sweeps: 0,
            last_report: None,
        }
    }
}

/// Writer side, owned by the loop.
#[derive(Debug)]
pub(crate) struct StatusPublisher {
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusPublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::default());
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        self.tx.send_modify(|s| s.state = state);
    }

    pub(crate) fn record_sweep(&self, report: &SweepReport) {
        self.tx.send_modify(|s| {
            s.sweeps += 1;
            s.last_report = Some(report.clone());
        });
    }
}
