use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::cache::GroupKey;
use crate::constants::CONFIG_CONTROLLER_PATH;
use crate::constants::LINE_SEPARATOR;
use crate::constants::LISTENER_PATH;
use crate::constants::LONG_PULLING_CLIENT_IDENTIFICATION;
use crate::constants::LONG_PULLING_TIMEOUT;
use crate::constants::LONG_PULLING_TIMEOUT_NO_HANGUP;
use crate::constants::PROBE_MODIFY_REQUEST;
use crate::constants::WEIGHT_CONFIGS;
use crate::constants::WORD_SEPARATOR;
use crate::request_nonce;
use crate::HttpAgent;
use crate::LongPollConfig;
use crate::ProtocolError;
use crate::Result;
use crate::ThreadPoolParameter;

/// A key the server reported as changed. `tenant` is absent on two-part lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedKey {
    pub key: String,
    pub group: String,
    pub tenant: Option<String>,
}

/// Server calls made by the long-poll loop.
pub struct ConfigFetcher {
    agent: Arc<dyn HttpAgent>,
    identity: String,
    config: LongPollConfig,
}

impl ConfigFetcher {
    pub fn new(
        agent: Arc<dyn HttpAgent>,
        identity: String,
        config: LongPollConfig,
    ) -> Self {
        Self {
            agent,
            identity,
            config,
        }
    }

    pub fn config(&self) -> &LongPollConfig {
        &self.config
    }

    /// Sends one change-check probe and returns the keys the server reports
    /// as changed. The server holds the call up to the poll timeout unless
    /// `no_hangup` is set.
    pub async fn check_update(
        &self,
        probe: &str,
        no_hangup: bool,
    ) -> Result<Vec<ChangedKey>> {
        let mut headers = HashMap::from([
            (LONG_PULLING_TIMEOUT.to_string(), self.config.timeout_in_ms.to_string()),
            (LONG_PULLING_CLIENT_IDENTIFICATION.to_string(), self.identity.clone()),
        ]);
        if no_hangup {
            headers.insert(LONG_PULLING_TIMEOUT_NO_HANGUP.to_string(), "true".to_string());
        }
        let params = HashMap::from([
            (PROBE_MODIFY_REQUEST.to_string(), probe.to_string()),
            (WEIGHT_CONFIGS.to_string(), request_nonce()),
        ]);

        let result = self
            .agent
            .post_by_config(LISTENER_PATH, headers, params, self.config.read_timeout())
            .await?
            .into_success()?;

        match result.data {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(serde_json::Value::String(data)) => Ok(parse_update_response(&data)),
            Some(_) => Err(ProtocolError::MissingData(LISTENER_PATH.to_string()).into()),
        }
    }

    /// Fetches the current content of one entry, normalized.
    pub async fn fetch_config(
        &self,
        group_key: &GroupKey,
    ) -> Result<String> {
        let params = HashMap::from([
            ("namespace".to_string(), group_key.namespace().to_string()),
            ("itemId".to_string(), group_key.group().to_string()),
            ("tpId".to_string(), group_key.key().to_string()),
            ("instanceId".to_string(), self.identity.clone()),
        ]);

        let result = self
            .agent
            .get_by_config(
                CONFIG_CONTROLLER_PATH,
                HashMap::new(),
                params,
                self.config.fetch_timeout(),
            )
            .await?
            .into_success()?;

        let data = result
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| ProtocolError::MissingData(CONFIG_CONTROLLER_PATH.to_string()))?;
        let content = ThreadPoolParameter::from_value(data)?.normalized_content()?;
        debug!(%group_key, "fetched config");
        Ok(content)
    }
}

/// Decodes a change-check response body into changed keys.
///
/// The body is form-decoded as a whole (`+` is a space, `%XX` an escape),
/// then split into lines and fields.
/// Lines with other than two or three fields are logged and skipped.
pub fn parse_update_response(data: &str) -> Vec<ChangedKey> {
    if data.is_empty() {
        return Vec::new();
    }

    let spaced = data.replace('+', " ");
    let decoded = match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("change-check response is not valid UTF-8 after decoding: {}", e);
            return Vec::new();
        }
    };

    decoded
        .split(LINE_SEPARATOR)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(WORD_SEPARATOR).collect();
            match parts.as_slice() {
                [key, group] => Some(ChangedKey {
                    key: key.to_string(),
                    group: group.to_string(),
                    tenant: None,
                }),
                [key, group, tenant] => Some(ChangedKey {
                    key: key.to_string(),
                    group: group.to_string(),
                    tenant: Some(tenant.to_string()),
                }),
                _ => {
                    warn!("{}", ProtocolError::InvalidLine(line.to_string()));
                    None
                }
            }
        })
        .collect()
}
