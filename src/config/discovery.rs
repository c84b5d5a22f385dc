use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

pub const MAX_HEARTBEAT_INTERVAL_IN_SECS: u64 = 86_400;
pub const MAX_SHUTDOWN_AWAIT_IN_MS: u64 = 600_000;

/// Registration and heartbeat settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Register with the server and send heartbeats
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Delay between two renew calls (seconds)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_in_secs: u64,

    /// Upper bound on waiting for background work during shutdown (milliseconds)
    #[serde(default = "default_shutdown_await")]
    pub shutdown_await_in_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            heartbeat_interval_in_secs: default_heartbeat_interval(),
            shutdown_await_in_ms: default_shutdown_await(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "discovery.heartbeat_interval_in_secs must be > 0".into(),
            )));
        }
        if self.heartbeat_interval_in_secs > MAX_HEARTBEAT_INTERVAL_IN_SECS {
            return Err(Error::Config(ConfigError::Message(format!(
                "discovery.heartbeat_interval_in_secs must be <= {MAX_HEARTBEAT_INTERVAL_IN_SECS}"
            ))));
        }
        if self.shutdown_await_in_ms > MAX_SHUTDOWN_AWAIT_IN_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "discovery.shutdown_await_in_ms must be <= {MAX_SHUTDOWN_AWAIT_IN_MS}"
            ))));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_in_secs)
    }

    pub fn shutdown_await(&self) -> Duration {
        Duration::from_millis(self.shutdown_await_in_ms)
    }
}

fn default_enabled() -> bool {
    true
}
fn default_heartbeat_interval() -> u64 {
    30
}
fn default_shutdown_await() -> u64 {
    3_000
}
