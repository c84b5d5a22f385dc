use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Periodic server health probing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthCheckConfig {
    /// Run the scheduled probe; when disabled the server is always considered healthy
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Delay between two probes (seconds)
    #[serde(default = "default_check_interval")]
    pub check_interval_in_secs: u64,

    /// Consecutive failed probes before the server is marked unhealthy
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Read timeout of one probe (milliseconds)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_in_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            check_interval_in_secs: default_check_interval(),
            failure_threshold: default_failure_threshold(),
            probe_timeout_in_ms: default_probe_timeout(),
        }
    }
}

impl HealthCheckConfig {
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "health.check_interval_in_secs must be > 0".into(),
            )));
        }
        if self.check_interval_in_secs > 86_400 || self.probe_timeout_in_ms > 3_600_000 {
            return Err(Error::Config(ConfigError::Message(
                "health.check_interval_in_secs must be <= 86400 and probe_timeout_in_ms <= 3600000".into(),
            )));
        }
        if self.failure_threshold == 0 {
            return Err(Error::Config(ConfigError::Message(
                "health.failure_threshold must be >= 1".into(),
            )));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_in_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_in_ms)
    }
}

fn default_enabled() -> bool {
    true
}
fn default_check_interval() -> u64 {
    5
}
fn default_failure_threshold() -> u32 {
    1
}
fn default_probe_timeout() -> u64 {
    3_000
}
