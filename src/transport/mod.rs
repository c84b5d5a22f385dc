//! HTTP transport to the control server.
//!
//! The client loops only see the [`HttpAgent`] trait. [`ServerHttpAgent`] is
//! the `reqwest` implementation, failing over across the configured server
//! addresses.
mod http_agent;
mod server_list;

pub use http_agent::*;
pub use server_list::*;

#[cfg(test)]
mod http_agent_test;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::constants::NOT_FOUND_CODE;
use crate::constants::SERVICE_ERROR_CODE;
use crate::constants::SUCCESS_CODE;
use crate::Error;
use crate::Result;

/// Envelope of every server response: `code` `"0"` means success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResult {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RestResult {
    pub fn success(data: Option<Value>) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            message: None,
            data,
        }
    }

    pub fn failure(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: Some(message.into()),
            data: None,
        }
    }

    /// Local failure result for a call that never got an answer.
    pub fn service_error(message: impl Into<String>) -> Self {
        Self::failure(SERVICE_ERROR_CODE, message)
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND_CODE
    }

    /// `data` as a string, if it is one.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }

    /// Turns a non-success code into [`Error::NotFound`] or [`Error::Rejected`].
    pub fn into_success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        if self.is_not_found() {
            return Err(Error::NotFound(self.message.unwrap_or_default()));
        }
        Err(Error::Rejected {
            message: self.message.unwrap_or_default(),
            code: self.code,
        })
    }
}

/// Calls to the control server.
///
/// Config calls carry string headers and params and an explicit read
/// timeout, since a long-poll probe is held open by the server. Discovery
/// calls carry a JSON body and use the transport's default timeout.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpAgent: Send + Sync + 'static {
    async fn post_by_config(
        &self,
        path: &str,
        headers: HashMap<String, String>,
        params: HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<RestResult>;

    async fn get_by_config(
        &self,
        path: &str,
        headers: HashMap<String, String>,
        params: HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<RestResult>;

    async fn post_by_discovery(
        &self,
        path: &str,
        body: Value,
    ) -> Result<RestResult>;
}
