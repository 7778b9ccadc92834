//! Reaper configuration.
//!
//! Values come from the CLI (flags or environment variables) and are
//! validated when the reaper is built.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::domain::{NameError, ProjectId};

pub const DEFAULT_THRESHOLD_SECONDS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid project: {0}")]
    InvalidProject(#[from] NameError),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("threshold_seconds={0} is out of range")]
    ThresholdOutOfRange(u64),

    #[error("no control plane configured")]
    MissingControlPlane,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Project whose instances are swept.
    pub project: String,

    /// Minimum session age that triggers eviction (inclusive).
    pub threshold_seconds: u64,

    /// Delay between sweeps.
    pub poll_interval_seconds: u64,

    /// Timeout applied to every control-plane request.
    pub request_timeout_seconds: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            threshold_seconds: DEFAULT_THRESHOLD_SECONDS,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl ReaperConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    pub fn project_id(&self) -> Result<ProjectId, ConfigError> {
        Ok(ProjectId::new(self.project.clone())?)
    }

    pub fn threshold(&self) -> Result<TimeDelta, ConfigError> {
        if self.threshold_seconds == 0 {
            return Err(ConfigError::NotPositive {
                field: "threshold_seconds",
            });
        }
        i64::try_from(self.threshold_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(ConfigError::ThresholdOutOfRange(self.threshold_seconds))
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        positive_secs(self.poll_interval_seconds, "poll_interval_seconds")
    }

    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        positive_secs(self.request_timeout_seconds, "request_timeout_seconds")
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.project_id()?;
        self.threshold()?;
        self.poll_interval()?;
        self.request_timeout()?;
        Ok(())
    }
}

fn positive_secs(secs: u64, field: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::NotPositive { field });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ReaperConfig::new("p1");
        assert_eq!(config.threshold().unwrap(), TimeDelta::seconds(300));
        assert_eq!(config.poll_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ReaperConfig =
            serde_json::from_str(r#"{"project": "p1", "threshold_seconds": 120}"#).unwrap();
        assert_eq!(config.threshold_seconds, 120);
        assert_eq!(config.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECONDS);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = ReaperConfig::new("p1");
        config.poll_interval_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "poll_interval_seconds"
            })
        ));
    }

    #[test]
    fn huge_threshold_is_out_of_range() {
        let mut config = ReaperConfig::new("p1");
        config.threshold_seconds = u64::MAX;
        assert!(matches!(
            config.threshold(),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));
    }
}
