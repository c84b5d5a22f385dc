use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use super::HttpAgent;
use super::RestResult;
use super::ServerListManager;
use crate::ProtocolError;
use crate::Result;
use crate::ServerConfig;
use crate::TransportError;

enum Payload {
    Form(HashMap<String, String>),
    Query(HashMap<String, String>),
    Json(Value),
}

/// [`HttpAgent`] over `reqwest`.
///
/// Every path is resolved under the configured base path on the current
/// server. A transport failure moves the server list to the next address so
/// the following call tries another server.
#[derive(Debug)]
pub struct ServerHttpAgent {
    client: Client,
    servers: ServerListManager,
    base_path: String,
    request_timeout: Duration,
}

impl ServerHttpAgent {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_in_ms))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            servers: ServerListManager::new(config.addresses.clone()),
            base_path: config.base_path.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(config.request_timeout_in_ms),
        })
    }

    pub fn servers(&self) -> &ServerListManager {
        &self.servers
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        headers: HashMap<String, String>,
        payload: Payload,
        timeout: Duration,
    ) -> Result<RestResult> {
        let server = self.servers.current()?;
        let url = format!("{}{}{}", server, self.base_path, path);
        trace!(%method, %url, "sending request");

        let mut request = self.client.request(method, &url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request = match payload {
            Payload::Form(params) => request.form(&params),
            Payload::Query(params) => request.query(&params),
            Payload::Json(body) => request.json(&body),
        };

        let outcome = self.read_response(request, &url, timeout).await;
        if let Err(crate::Error::Transport(ref e)) = outcome {
            debug!("request to {} failed: {}", url, e);
            if !matches!(e, TransportError::HttpStatus { .. }) {
                self.servers.rotate_from(server);
            }
        }
        outcome
    }

    async fn read_response(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> Result<RestResult> {
        let map_err = |source: reqwest::Error| {
            if source.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                    duration: timeout,
                }
            } else {
                TransportError::Request {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let response = request.send().await.map_err(map_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await.map_err(map_err)?;
        let result: RestResult = serde_json::from_str(&body).map_err(ProtocolError::Json)?;
        Ok(result)
    }
}

#[async_trait]
impl HttpAgent for ServerHttpAgent {
    async fn post_by_config(
        &self,
        path: &str,
        headers: HashMap<String, String>,
        params: HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<RestResult> {
        self.execute(Method::POST, path, headers, Payload::Form(params), read_timeout)
            .await
    }

    async fn get_by_config(
        &self,
        path: &str,
        headers: HashMap<String, String>,
        params: HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<RestResult> {
        self.execute(Method::GET, path, headers, Payload::Query(params), read_timeout)
            .await
    }

    async fn post_by_discovery(
        &self,
        path: &str,
        body: Value,
    ) -> Result<RestResult> {
        self.execute(
            Method::POST,
            path,
            HashMap::new(),
            Payload::Json(body),
            self.request_timeout,
        )
        .await
    }
}
