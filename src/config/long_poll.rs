use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Upper bound for every long-poll duration: one hour
pub const MAX_TIMEOUT_IN_MS: u64 = 3_600_000;

/// Timing of the long-poll loop
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LongPollConfig {
    /// How long the server may hold a probe open (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout_in_ms: u64,

    /// Read timeout for fetching one changed entry (milliseconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_in_ms: u64,

    /// Pause after a failed cycle before the next one (milliseconds)
    #[serde(default = "default_failure_backoff")]
    pub failure_backoff_in_ms: u64,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            timeout_in_ms: default_timeout(),
            fetch_timeout_in_ms: default_fetch_timeout(),
            failure_backoff_in_ms: default_failure_backoff(),
        }
    }
}

impl LongPollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "long_poll.timeout_in_ms must be > 0".into(),
            )));
        }
        if self.timeout_in_ms > MAX_TIMEOUT_IN_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "long_poll.timeout_in_ms must be <= {MAX_TIMEOUT_IN_MS}"
            ))));
        }
        if self.fetch_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "long_poll.fetch_timeout_in_ms must be > 0".into(),
            )));
        }
        if self.fetch_timeout_in_ms > MAX_TIMEOUT_IN_MS || self.failure_backoff_in_ms > MAX_TIMEOUT_IN_MS {
            return Err(Error::Config(ConfigError::Message(format!(
                "long_poll fetch timeout and failure backoff must be <= {MAX_TIMEOUT_IN_MS}"
            ))));
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }

    /// Transport read timeout: the hold time plus half of it, so the client
    /// never cuts off a server that is legitimately holding the connection.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms.saturating_add(self.timeout_in_ms / 2))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_in_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_in_ms)
    }
}

fn default_timeout() -> u64 {
    30_000
}
fn default_fetch_timeout() -> u64 {
    3_000
}
fn default_failure_backoff() -> u64 {
    1_000
}
