//! Wires the configuration client, health check and discovery client
//! together.
//!
//! ## Example
//! ```ignore
//! let config = ClientConfig::new()?.validate()?;
//! let agent = AgentBuilder::new(config).build().await?;
//! let pool = agent.watch_pool("message-consume").await?;
//! agent.notify_application_complete();
//! // ...
//! agent.shutdown().await;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::detect_local_ip;
use crate::generate_identity;
use crate::metrics;
use crate::AlwaysHealthy;
use crate::ClientConfig;
use crate::ClientWorker;
use crate::DiscoveryClient;
use crate::DynamicPool;
use crate::HttpAgent;
use crate::InstanceInfo;
use crate::Result;
use crate::ScheduledHealthCheck;
use crate::ServerHealthCheck;
use crate::ServerHttpAgent;
use crate::ShutdownGate;

/// Builds an [`Agent`] from configuration, with optional component overrides.
pub struct AgentBuilder {
    config: ClientConfig,
    http_agent: Option<Arc<dyn HttpAgent>>,
    health_check: Option<Arc<dyn ServerHealthCheck>>,
    identity: Option<String>,
}

impl AgentBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_agent: None,
            health_check: None,
            identity: None,
        }
    }

    /// Replaces the `reqwest` transport.
    pub fn http_agent(
        mut self,
        http_agent: Arc<dyn HttpAgent>,
    ) -> Self {
        self.http_agent = Some(http_agent);
        self
    }

    /// Replaces the scheduled health probe. The caller drives the supplied check.
    pub fn health_check(
        mut self,
        health_check: Arc<dyn ServerHealthCheck>,
    ) -> Self {
        self.health_check = Some(health_check);
        self
    }

    pub fn identity(
        mut self,
        identity: impl Into<String>,
    ) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Validates the configuration and starts every background task.
    /// Discovery registration happens here when enabled.
    pub async fn build(self) -> Result<Agent> {
        let config = self.config.validate()?;
        metrics::register_custom_metrics();

        let host = config
            .application
            .host
            .clone()
            .unwrap_or_else(|| detect_local_ip().to_string());
        let identity = self
            .identity
            .unwrap_or_else(|| generate_identity(&host, config.application.port));
        info!(%identity, "starting agent");

        let http_agent: Arc<dyn HttpAgent> = match self.http_agent {
            Some(http_agent) => http_agent,
            None => Arc::new(ServerHttpAgent::new(&config.server)?),
        };
        let shutdown = ShutdownGate::new();

        let mut health_task = None;
        let health: Arc<dyn ServerHealthCheck> = match self.health_check {
            Some(health) => health,
            None if config.health.enabled => {
                let scheduled = Arc::new(ScheduledHealthCheck::new(config.health.failure_threshold));
                health_task = Some(scheduled.clone().start(
                    http_agent.clone(),
                    config.health.clone(),
                    shutdown.child_token(),
                ));
                scheduled
            }
            None => {
                debug!("health probing disabled");
                Arc::new(AlwaysHealthy)
            }
        };

        let worker = ClientWorker::new(
            http_agent.clone(),
            identity.clone(),
            health.clone(),
            shutdown.clone(),
            config.long_poll.clone(),
        );

        let discovery = if config.discovery.enabled {
            let instance = Arc::new(InstanceInfo::new(&config.application, &host, &identity));
            Some(
                DiscoveryClient::start(
                    http_agent,
                    instance,
                    config.discovery.clone(),
                    shutdown.child_token(),
                )
                .await,
            )
        } else {
            None
        };

        Ok(Agent {
            config,
            identity,
            worker,
            discovery,
            health,
            shutdown,
            health_task: Mutex::new(health_task),
        })
    }
}

/// A running client: long polling, health probing and (optionally) discovery.
pub struct Agent {
    config: ClientConfig,
    identity: String,
    worker: Arc<ClientWorker>,
    discovery: Option<Arc<DiscoveryClient>>,
    health: Arc<dyn ServerHealthCheck>,
    shutdown: ShutdownGate,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("identity", &self.identity)
            .field("worker", &self.worker)
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn worker(&self) -> &Arc<ClientWorker> {
        &self.worker
    }

    pub fn discovery(&self) -> Option<&Arc<DiscoveryClient>> {
        self.discovery.as_ref()
    }

    pub fn health(&self) -> &Arc<dyn ServerHealthCheck> {
        &self.health
    }

    /// Subscribes a [`DynamicPool`] to `tp_id` in the configured namespace
    /// and item.
    pub async fn watch_pool(
        &self,
        tp_id: &str,
    ) -> Result<Arc<DynamicPool>> {
        let pool = DynamicPool::new(tp_id);
        let app = &self.config.application;
        let entry = self
            .worker
            .add_listeners(&app.namespace, &app.item_id, tp_id, vec![pool.refresh_listener()])
            .await?;
        if !entry.is_populated() {
            warn!(group_key = %entry.group_key(), "pool has no definition on the server yet");
        }
        Ok(pool)
    }

    pub fn notify_application_complete(&self) {
        self.worker.notify_application_complete();
    }

    /// Stops the poll loop, the heartbeat and the health probe. All of them
    /// share one deadline of the configured await timeout. Returns whether
    /// all of them stopped in time.
    pub async fn shutdown(&self) -> bool {
        let deadline = Instant::now() + self.config.discovery.shutdown_await();
        let mut clean = self
            .worker
            .shutdown(deadline.saturating_duration_since(Instant::now()))
            .await;

        if let Some(discovery) = &self.discovery {
            clean &= discovery.shutdown_until(deadline).await;
        }

        self.shutdown.request();
        let health_task = self.health_task.lock().take();
        if let Some(handle) = health_task {
            let abort = handle.abort_handle();
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                warn!("health check did not stop in time, aborting");
                abort.abort();
                clean = false;
            }
        }

        info!(identity = %self.identity, clean, "agent stopped");
        clean
    }
}
