use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ServerHealthCheck;
use crate::constants::HEALTH_CHECK_PATH;
use crate::constants::HEALTH_UP;
use crate::HealthCheckConfig;
use crate::HttpAgent;

/// Health flag maintained by a periodic probe of the server's health endpoint.
///
/// Starts healthy. A probe answering `"UP"` marks the server healthy and
/// wakes waiters; `failure_threshold` failed probes in a row mark it
/// unhealthy.
pub struct ScheduledHealthCheck {
    healthy: watch::Sender<bool>,
    consecutive_failures: AtomicU32,
    failure_threshold: u32,
}

impl std::fmt::Debug for ScheduledHealthCheck {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ScheduledHealthCheck")
            .field("healthy", &self.is_healthy())
            .field("consecutive_failures", &self.consecutive_failures.load(Ordering::Relaxed))
            .finish()
    }
}

impl ScheduledHealthCheck {
    pub fn new(failure_threshold: u32) -> Self {
        let (healthy, _) = watch::channel(true);
        Self {
            healthy,
            consecutive_failures: AtomicU32::new(0),
            failure_threshold: failure_threshold.max(1),
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.set_health_status(true);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.failure_threshold {
            self.set_health_status(false);
        }
    }

    /// One probe of the health endpoint. Returns whether it answered `"UP"`.
    pub async fn probe(
        &self,
        agent: &dyn HttpAgent,
        config: &HealthCheckConfig,
    ) -> bool {
        let result = agent
            .get_by_config(
                HEALTH_CHECK_PATH,
                HashMap::new(),
                HashMap::new(),
                config.probe_timeout(),
            )
            .await;

        let up = match result {
            Ok(result) => result.is_success() && result.data_str() == Some(HEALTH_UP),
            Err(e) => {
                debug!("health probe failed: {}", e);
                false
            }
        };
        if up {
            self.record_success();
        } else {
            self.record_failure();
        }
        up
    }

    /// Probes every `check_interval` until `token` is cancelled.
    pub fn start(
        self: Arc<Self>,
        agent: Arc<dyn HttpAgent>,
        config: HealthCheckConfig,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.check_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("health check stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        self.probe(agent.as_ref(), &config).await;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl ServerHealthCheck for ScheduledHealthCheck {
    fn is_healthy(&self) -> bool {
        *self.healthy.borrow()
    }

    fn set_health_status(
        &self,
        healthy: bool,
    ) {
        let changed = self.healthy.send_if_modified(|current| {
            if *current == healthy {
                false
            } else {
                *current = healthy;
                true
            }
        });
        if changed {
            if healthy {
                info!("server is healthy again");
            } else {
                warn!("server marked unhealthy");
            }
        }
    }

    async fn wait_until_healthy(&self) {
        let mut rx = self.healthy.subscribe();
        let _ = rx.wait_for(|healthy| *healthy).await;
    }
}
