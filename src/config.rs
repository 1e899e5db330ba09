//! Configuration for the sync engine
//!
//! All protocol timing and thresholds live here so that tests can
//! shrink the intervals and the embedding client can tune them per
//! deployment. Values are loadable from a TOML file and validated
//! before use.

use crate::errors::{ConfigError, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable parameters of the synchronization protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between outgoing sync-check counter broadcasts (ms)
    pub sync_check_interval_ms: u64,
    /// Interval between heartbeat round-trip probes (ms)
    pub heartbeat_interval_ms: u64,
    /// How long a resync session may run before it is abandoned (ms)
    pub resync_timeout_ms: u64,
    /// Minimum spacing between full resyncs (ms)
    pub min_resync_interval_ms: u64,
    /// Largest counter gap the buffer will skip over without waiting
    /// for a resync to complete first
    pub gap_tolerance: u64,
    /// Gap-processing debounce before any latency measurement exists (ms)
    pub debounce_default_ms: u64,
    /// Gap-processing debounce on a fast link (ms)
    pub debounce_fast_ms: u64,
    /// Gap-processing debounce on a degraded link (ms)
    pub debounce_slow_ms: u64,
    /// Round-trip latency above which the link counts as degraded (ms)
    pub high_latency_threshold_ms: u64,
    /// Own-log entry count above which a resync responds with a
    /// snapshot instead of the full action list
    pub snapshot_threshold: usize,
    /// Interval between periodic snapshot autosaves (ms); 0 disables
    pub autosave_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_check_interval_ms: 1_250,
            heartbeat_interval_ms: 2_000,
            resync_timeout_ms: 10_000,
            min_resync_interval_ms: 15_000,
            gap_tolerance: 3,
            debounce_default_ms: 500,
            debounce_fast_ms: 300,
            debounce_slow_ms: 1_000,
            high_latency_threshold_ms: 200,
            snapshot_threshold: 50,
            autosave_interval_ms: 30_000,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config: Self = toml::from_str(&raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field consistency
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.gap_tolerance == 0 {
            return Err(ConfigError::InvalidValue {
                key: "gap_tolerance",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.resync_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "resync_timeout_ms",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.min_resync_interval_ms < self.resync_timeout_ms {
            return Err(ConfigError::InvalidValue {
                key: "min_resync_interval_ms",
                reason: "must not be shorter than resync_timeout_ms".into(),
            }
            .into());
        }
        if self.debounce_fast_ms > self.debounce_slow_ms {
            return Err(ConfigError::InvalidValue {
                key: "debounce_fast_ms",
                reason: "fast debounce must not exceed slow debounce".into(),
            }
            .into());
        }
        Ok(())
    }

    pub fn sync_check_interval(&self) -> Duration {
        Duration::from_millis(self.sync_check_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn resync_timeout(&self) -> Duration {
        Duration::from_millis(self.resync_timeout_ms)
    }

    pub fn min_resync_interval(&self) -> Duration {
        Duration::from_millis(self.min_resync_interval_ms)
    }

    pub fn debounce_default(&self) -> Duration {
        Duration::from_millis(self.debounce_default_ms)
    }

    pub fn debounce_fast(&self) -> Duration {
        Duration::from_millis(self.debounce_fast_ms)
    }

    pub fn debounce_slow(&self) -> Duration {
        Duration::from_millis(self.debounce_slow_ms)
    }

    pub fn high_latency_threshold(&self) -> Duration {
        Duration::from_millis(self.high_latency_threshold_ms)
    }

    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_ms > 0).then(|| Duration::from_millis(self.autosave_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_gap_tolerance_rejected() {
        let config = SyncConfig {
            gap_tolerance: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cooldown_shorter_than_timeout_rejected() {
        let config = SyncConfig {
            min_resync_interval_ms: 5_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: SyncConfig = toml::from_str("gap_tolerance = 2").unwrap();
        assert_eq!(config.gap_tolerance, 2);
        assert_eq!(config.snapshot_threshold, 50);
    }
}
