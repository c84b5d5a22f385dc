use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::cache::contains_reserved_delimiter;
use crate::Error;
use crate::Result;

/// Identity of the application embedding the client
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApplicationConfig {
    /// Application name reported on registration
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Namespace (tenant) the watched pools live in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Item (group) the watched pools belong to
    #[serde(default = "default_item_id")]
    pub item_id: String,

    /// Host reported to the server; detected when unset
    #[serde(default)]
    pub host: Option<String>,

    /// Port the application serves on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Context path under which the application answers callbacks
    #[serde(default)]
    pub client_base_path: Option<String>,

    /// Thread-pool ids the agent binary subscribes to
    #[serde(default)]
    pub watched_pools: Vec<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            namespace: default_namespace(),
            item_id: default_item_id(),
            host: None,
            port: default_port(),
            client_base_path: None,
            watched_pools: Vec::new(),
        }
    }
}

impl ApplicationConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("app_name", &self.app_name),
            ("namespace", &self.namespace),
            ("item_id", &self.item_id),
        ] {
            if value.is_empty() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "application.{field} must not be empty"
                ))));
            }
            if contains_reserved_delimiter(value) {
                return Err(Error::InvalidConfig(format!(
                    "application.{field} {value:?} contains a reserved delimiter"
                )));
            }
        }

        if let Some(pool) = self.watched_pools.iter().find(|p| contains_reserved_delimiter(p)) {
            return Err(Error::InvalidConfig(format!(
                "application.watched_pools entry {pool:?} contains a reserved delimiter"
            )));
        }

        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "application.port must be > 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_app_name() -> String {
    "application".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_item_id() -> String {
    "default".to_string()
}
fn default_port() -> u16 {
    8080
}
