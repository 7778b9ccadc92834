//! Eviction policy: age-based verdict for a single session.
//!
//! This module defines the Verdict type (what to do with a session) and the
//! EvictionPolicy that produces it from a creation time and the current time.

use chrono::{DateTime, TimeDelta, Utc};

/// The outcome of evaluating one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Age met or exceeded the threshold; delete the session.
    Evict { age: TimeDelta },

    /// Younger than the threshold.
    Keep { age: TimeDelta },

    /// Creation time is ahead of the local clock (clock skew).
    /// Never eligible for eviction.
    FutureCreateTime { ahead: TimeDelta },
}

impl Verdict {
    pub fn is_evict(&self) -> bool {
        matches!(self, Verdict::Evict { .. })
    }
}

/// Age-threshold policy.
///
/// A pure function of `(create_time, now)`: no hysteresis, no grace period.
/// The boundary is inclusive, so a session exactly `threshold` old is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    threshold: TimeDelta,
}

impl EvictionPolicy {
    pub fn new(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Evaluate a session created at `create_time`, observed at `now`.
    pub fn evaluate(&self, create_time: DateTime<Utc>, now: DateTime<Utc>) -> Verdict {
        let age = now.signed_duration_since(create_time);
        if age < TimeDelta::zero() {
            Verdict::FutureCreateTime { ahead: -age }
        } else if age >= self.threshold {
            Verdict::Evict { age }
        } else {
            Verdict::Keep { age }
        }
    }
}

/// Seconds with millisecond precision, for log fields.
pub fn as_secs_f64(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}
