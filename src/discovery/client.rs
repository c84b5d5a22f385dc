use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::InstanceInfo;
use crate::constants::CLIENT_CLOSE_PATH;
use crate::constants::REGISTER_PATH;
use crate::constants::RENEW_PATH;
use crate::metrics::HEARTBEAT_RESULTS;
use crate::utils::time::now_millis;
use crate::DiscoveryConfig;
use crate::Error;
use crate::HttpAgent;
use crate::ProtocolError;
use crate::RestResult;
use crate::Result;

/// Registration state as seen from this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Unregistered,
    Registered,
    /// The server lost this instance and re-registration has not yet succeeded
    Dirty,
}

/// Keeps this process registered with the server.
///
/// Registers once on start, then renews every heartbeat interval. A renew
/// answered with not-found marks the instance dirty and re-registers it.
pub struct DiscoveryClient {
    agent: Arc<dyn HttpAgent>,
    instance: Arc<InstanceInfo>,
    config: DiscoveryConfig,
    token: CancellationToken,
    registered: AtomicBool,
    last_successful_heartbeat: AtomicU64,
    handle: Mutex<Option<JoinHandle<()>>>,
    /// "APPNAME/instance-id", used in every log line
    app_path: String,
}

impl std::fmt::Debug for DiscoveryClient {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DiscoveryClient")
            .field("app_path", &self.app_path)
            .field("state", &self.state())
            .finish()
    }
}

impl DiscoveryClient {
    /// Registers once and starts the heartbeat task. A failed registration is
    /// logged; the heartbeat still starts and repairs it on not-found.
    pub async fn start(
        agent: Arc<dyn HttpAgent>,
        instance: Arc<InstanceInfo>,
        config: DiscoveryConfig,
        token: CancellationToken,
    ) -> Arc<Self> {
        let app_path = format!("{}/{}", instance.app_name().to_uppercase(), instance.instance_id());
        let client = Arc::new(Self {
            agent,
            instance,
            config,
            token,
            registered: AtomicBool::new(false),
            last_successful_heartbeat: AtomicU64::new(0),
            handle: Mutex::new(None),
            app_path,
        });

        client.register().await;
        let handle = tokio::spawn(client.clone().heartbeat_loop());
        *client.handle.lock() = Some(handle);
        client
    }

    pub fn instance(&self) -> &Arc<InstanceInfo> {
        &self.instance
    }

    pub fn state(&self) -> DiscoveryState {
        if self.instance.is_dirty() {
            DiscoveryState::Dirty
        } else if self.registered.load(Ordering::Acquire) {
            DiscoveryState::Registered
        } else {
            DiscoveryState::Unregistered
        }
    }

    /// Epoch millis of the last successful renew, 0 if none yet.
    pub fn last_successful_heartbeat(&self) -> u64 {
        self.last_successful_heartbeat.load(Ordering::Acquire)
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let period = self.config.heartbeat_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    debug!("{} - heartbeat stopped", self.app_path);
                    return;
                }
                _ = ticker.tick() => {
                    if self.renew().await {
                        self.last_successful_heartbeat.store(now_millis(), Ordering::Release);
                    }
                }
            }
        }
    }

    /// Sends the full instance record. Returns whether the server accepted it.
    pub async fn register(&self) -> bool {
        info!("{} - registering service...", self.app_path);
        let outcome = self.post(REGISTER_PATH, &self.instance.register_request()).await;
        let success = match outcome {
            Ok(result) => result.is_success(),
            Err(e) => {
                error!("{} - registration failed: {}", self.app_path, e);
                false
            }
        };
        if success {
            self.registered.store(true, Ordering::Release);
        }
        info!(
            "{} - registration status: {}",
            self.app_path,
            if success { "success" } else { "fail" }
        );
        success
    }

    /// One heartbeat. Returns whether the instance is known to the server
    /// after the call.
    pub async fn renew(&self) -> bool {
        if self.token.is_cancelled() {
            debug!("{} - heartbeat skipped, client is shutting down", self.app_path);
            return false;
        }

        let outcome = self
            .post(RENEW_PATH, &self.instance.renew_request())
            .await
            .and_then(RestResult::into_success);
        match outcome {
            Ok(_) => {
                HEARTBEAT_RESULTS.with_label_values(&["ok"]).inc();
                true
            }
            Err(Error::NotFound(_)) => {
                HEARTBEAT_RESULTS.with_label_values(&["not_found"]).inc();
                warn!("{} - unknown to server, re-registering", self.app_path);
                let timestamp = self.instance.mark_dirty();
                let success = self.register().await;
                if success && !self.instance.clear_dirty(timestamp) {
                    debug!("{} - newer dirty mark outstanding, left dirty", self.app_path);
                }
                success
            }
            Err(Error::Rejected { code, message }) => {
                HEARTBEAT_RESULTS.with_label_values(&["rejected"]).inc();
                warn!(
                    "{} - heartbeat rejected with code {}: {}",
                    self.app_path, code, message
                );
                false
            }
            Err(e) => {
                HEARTBEAT_RESULTS.with_label_values(&["error"]).inc();
                error!("{} - was unable to send heartbeat: {}", self.app_path, e);
                false
            }
        }
    }

    /// Stops the heartbeat, waiting up to the configured await timeout, then
    /// sends a best-effort close notice. Returns whether the heartbeat task
    /// ended in time.
    pub async fn shutdown(&self) -> bool {
        self.shutdown_until(Instant::now() + self.config.shutdown_await()).await
    }

    /// Same as [`shutdown`](Self::shutdown), but the heartbeat wait and the
    /// close notice together never run past `deadline`.
    pub async fn shutdown_until(
        &self,
        deadline: Instant,
    ) -> bool {
        info!("{} - destroy service...", self.app_path);
        self.token.cancel();

        let handle = self.handle.lock().take();
        let stopped = match handle {
            Some(handle) => {
                let abort = handle.abort_handle();
                match tokio::time::timeout_at(deadline, handle).await {
                    Ok(_) => true,
                    Err(_) => {
                        warn!("{} - heartbeat did not stop in time, aborting", self.app_path);
                        abort.abort();
                        false
                    }
                }
            }
            None => true,
        };

        let close_request = self.instance.close_request();
        let close = self.post(CLIENT_CLOSE_PATH, &close_request);
        match tokio::time::timeout_at(deadline, close).await {
            Ok(Ok(result)) if result.is_success() => {
                info!("{} - client close hook success", self.app_path);
            }
            Ok(Ok(result)) => {
                warn!("{} - client close hook rejected with code {}", self.app_path, result.code);
            }
            Ok(Err(e)) => {
                error!("{} - client close hook fail: {}", self.app_path, e);
            }
            Err(_) => {
                warn!("{} - client close hook abandoned, shutdown deadline passed", self.app_path);
            }
        }
        stopped
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<RestResult> {
        let body = serde_json::to_value(body).map_err(ProtocolError::Json)?;
        self.agent.post_by_discovery(path, body).await
    }
}
