//! SweepReport - 1 回の sweep の集計
//!
//! sweep 終了時に 1 件のサマリーイベントとしてログに出します。

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counts gathered during one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    pub instances: usize,
    pub databases: usize,
    pub sessions: usize,

    pub evicted: usize,
    pub kept: usize,
    pub future_dated: usize,
    pub already_gone: usize,

    /// Listing calls that failed (the affected sub-tree was skipped).
    pub enumeration_failures: usize,
    pub eviction_failures: usize,
}

impl SweepReport {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(at),
            ..Self::default()
        }
    }

    /// Every listing call succeeded.
    pub fn is_complete(&self) -> bool {
        self.enumeration_failures == 0
    }
}

/// Totals returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub sweeps: u64,
    pub evicted: u64,
}

impl LoopSummary {
    pub fn record(&mut self, report: &SweepReport) {
        self.sweeps += 1;
        self.evicted += report.evicted as u64;
    }
}
