//! Configuration management for the configuration-sync client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`POOLWATCH__SECTION__FIELD`)
//! - Section-wise validation
mod application;
mod discovery;
mod health;
mod long_poll;
mod server;
pub use application::*;
pub use discovery::*;
pub use health::*;
pub use long_poll::*;
pub use server::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "POOLWATCH";

/// Main configuration container for the client
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ClientConfig {
    /// Control server addresses and HTTP parameters
    #[serde(default)]
    pub server: ServerConfig,
    /// Long-poll loop timing
    #[serde(default)]
    pub long_poll: LongPollConfig,
    /// Registration and heartbeat settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Server health probing
    #[serde(default)]
    pub health: HealthCheckConfig,
    /// Identity of the embedding application
    #[serde(default)]
    pub application: ApplicationConfig,
}

impl Debug for ClientConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server", &self.server)
            .field("application", &self.application)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `POOLWATCH__` prefix (highest priority)
    ///
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/client.toml");
    /// std::env::set_var("POOLWATCH__LONG_POLL__TIMEOUT_IN_MS", "20000");
    /// let cfg = ClientConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.long_poll.validate()?;
        self.discovery.validate()?;
        self.health.validate()?;
        self.application.validate()?;
        Ok(self)
    }
}

fn environment_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.addresses")
        .with_list_parse_key("application.watched_pools")
}
