use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Where the control server lives and how to talk to it
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server base URLs, tried in order; the next one is used after a transport failure
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,

    /// Path prefix shared by every endpoint
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Read timeout for discovery calls in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addresses: default_addresses(),
            base_path: default_base_path(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.addresses.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "server.addresses must contain at least one address".into(),
            )));
        }

        for address in &self.addresses {
            if !address.starts_with("http://") && !address.starts_with("https://") {
                return Err(Error::Config(ConfigError::Message(format!(
                    "server address {address:?} must start with http:// or https://"
                ))));
            }
        }

        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "server.base_path {:?} must start with '/'",
                self.base_path
            ))));
        }

        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "server.connect_timeout_in_ms must be > 0".into(),
            )));
        }

        if self.request_timeout_in_ms <= self.connect_timeout_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "server request timeout {}ms must exceed connect timeout {}ms",
                self.request_timeout_in_ms, self.connect_timeout_in_ms
            ))));
        }

        Ok(())
    }

    /// Full path of an endpoint under the base path
    pub fn path(
        &self,
        endpoint: &str,
    ) -> String {
        format!("{}{}", self.base_path.trim_end_matches('/'), endpoint)
    }
}

fn default_addresses() -> Vec<String> {
    vec!["http://127.0.0.1:6691".to_string()]
}
fn default_base_path() -> String {
    "/hippo4j/v1/cs".to_string()
}
fn default_connect_timeout() -> u64 {
    2000
}
fn default_request_timeout() -> u64 {
    5000
}
