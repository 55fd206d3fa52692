use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    utils::parse_duration,
};

pub const DEFAULT_DEADLINE: &str = "30m";
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// The `[sync]` table of the config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Do not notify for versions already present in the product catalog.
    /// Default: false
    pub skip_known: Option<bool>,

    /// Upper bound for publishing a single artifact, e.g. "30m".
    /// "never" publishes inline without a deadline.
    /// Default: "30m"
    pub deadline: Option<String>,

    /// Log walk progress every N index positions.
    /// Default: 100000
    pub progress_interval: Option<u64>,
}

impl SyncConfig {
    pub fn default_config() -> Self {
        Self {
            skip_known: Some(false),
            deadline: Some(DEFAULT_DEADLINE.to_string()),
            progress_interval: Some(DEFAULT_PROGRESS_INTERVAL),
        }
    }

    pub fn skip_known(&self) -> bool {
        self.skip_known.unwrap_or(false)
    }

    /// The per-artifact publish deadline, or `None` when disabled.
    pub fn deadline(&self) -> Result<Option<Duration>> {
        let value = self.deadline.as_deref().unwrap_or(DEFAULT_DEADLINE);
        match value.trim() {
            "never" | "none" | "off" => Ok(None),
            other => {
                parse_duration(other)
                    .filter(|d| !d.is_zero())
                    .map(Some)
                    .ok_or_else(|| ConfigError::InvalidDuration(other.to_string()))
            }
        }
    }

    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PROGRESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sync = SyncConfig::default();
        assert!(!sync.skip_known());
        assert_eq!(
            sync.deadline().unwrap(),
            Some(Duration::from_secs(30 * 60))
        );
        assert_eq!(sync.progress_interval(), 100_000);
    }

    #[test]
    fn test_deadline_disabled() {
        for value in ["never", "none", "off"] {
            let sync = SyncConfig {
                deadline: Some(value.to_string()),
                ..SyncConfig::default()
            };
            assert_eq!(sync.deadline().unwrap(), None);
        }
    }

    #[test]
    fn test_deadline_invalid() {
        let sync = SyncConfig {
            deadline: Some("soon".to_string()),
            ..SyncConfig::default()
        };
        assert!(matches!(sync.deadline(), Err(ConfigError::InvalidDuration(_))));

        let zero = SyncConfig {
            deadline: Some("0s".to_string()),
            ..SyncConfig::default()
        };
        assert!(zero.deadline().is_err());
    }

    #[test]
    fn test_zero_progress_interval_falls_back() {
        let sync = SyncConfig {
            progress_interval: Some(0),
            ..SyncConfig::default()
        };
        assert_eq!(sync.progress_interval(), DEFAULT_PROGRESS_INTERVAL);
    }
}
