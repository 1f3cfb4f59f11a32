//! Migration session tuning.

use std::time::Duration;

use ferry_core::WriteMode;
use serde::{Deserialize, Serialize};

const fn default_settling_delay_ms() -> u64 {
    1000
}

const fn default_concurrency() -> usize {
    4
}

const fn default_sample_size() -> usize {
    10
}

const fn default_connect_attempts() -> u32 {
    3
}

const fn default_connect_backoff_ms() -> u64 {
    1000
}

const fn default_allow_degraded() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// How each logical write is applied to the two stores.
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Pause between the last write and reconciliation, in milliseconds.
    /// A propagation allowance, not a correctness guarantee.
    #[serde(default = "default_settling_delay_ms")]
    pub settling_delay_ms: u64,

    /// Maximum concurrent writes or consistency checks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Keys drawn for sample validation when none are named.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Connection attempts per store at session start.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Fixed delay between connection attempts, in milliseconds.
    #[serde(default = "default_connect_backoff_ms")]
    pub connect_backoff_ms: u64,

    /// Continue origin-only when the target cannot be reached.
    #[serde(default = "default_allow_degraded")]
    pub allow_degraded: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            settling_delay_ms: default_settling_delay_ms(),
            concurrency: default_concurrency(),
            sample_size: default_sample_size(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_ms: default_connect_backoff_ms(),
            allow_degraded: default_allow_degraded(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn settling_delay(&self) -> Duration {
        Duration::from_millis(self.settling_delay_ms)
    }

    #[must_use]
    pub const fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = SessionConfig::default();
        assert_eq!(config.write_mode, WriteMode::SyncBoth);
        assert_eq!(config.settling_delay(), Duration::from_secs(1));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.sample_size, 10);
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.connect_backoff(), Duration::from_secs(1));
        assert!(config.allow_degraded);
    }
}
