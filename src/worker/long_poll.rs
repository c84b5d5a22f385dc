use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::build_probe;
use super::ChangedKey;
use super::ConfigFetcher;
use crate::cache::CacheEntry;
use crate::cache::CacheRegistry;
use crate::cache::GroupKey;
use crate::metrics::CHANGED_KEYS;
use crate::metrics::CONFIG_FETCH_FAILURES;
use crate::metrics::LONG_POLL_CYCLES;
use crate::metrics::LONG_POLL_FAILURES;
use crate::OneShotGate;
use crate::Result;
use crate::ServerHealthCheck;
use crate::ShutdownGate;

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleOutcome {
    /// Probe sent and answered; `changed` keys were reported
    Completed { changed: usize },
    /// Nothing published to watch yet
    Idle,
    /// Shutdown observed mid-cycle; nothing was delivered
    Stopped,
}

/// The single background task that keeps watched entries current.
pub(crate) struct LongPollLoop {
    pub(crate) registry: Arc<CacheRegistry>,
    pub(crate) fetcher: Arc<ConfigFetcher>,
    pub(crate) health: Arc<dyn ServerHealthCheck>,
    pub(crate) shutdown: ShutdownGate,
    pub(crate) cache_ready: OneShotGate,
    pub(crate) identity: String,
}

impl LongPollLoop {
    pub(crate) async fn run(self) {
        if self.registry.is_empty() {
            debug!("no watched entries yet, waiting for the first listener");
            tokio::select! {
                _ = self.shutdown.cancelled() => {}
                _ = self.cache_ready.wait() => {}
            }
        }

        info!(identity = %self.identity, "long-poll loop started");
        loop {
            if self.shutdown.check_and_acknowledge() {
                info!("long-poll loop stopped");
                return;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => continue,
                _ = self.health.wait_until_healthy() => {}
            }

            match self.poll_once().await {
                Ok(CycleOutcome::Completed { changed }) => {
                    LONG_POLL_CYCLES.inc();
                    trace!(changed, "long-poll cycle completed");
                }
                Ok(CycleOutcome::Stopped) => {}
                Ok(CycleOutcome::Idle) => {
                    self.pause(self.fetcher.config().failure_backoff()).await;
                }
                Err(e) => {
                    LONG_POLL_FAILURES.inc();
                    if e.is_transport() {
                        warn!("long-poll request failed, marking server unhealthy: {}", e);
                        self.health.set_health_status(false);
                    } else {
                        warn!("long-poll cycle failed: {}", e);
                    }
                    self.pause(self.fetcher.config().failure_backoff()).await;
                }
            }
        }
    }

    /// One change-check cycle. Listener delivery happens only when shutdown
    /// was not requested during the call.
    pub(crate) async fn poll_once(&self) -> Result<CycleOutcome> {
        let entries = self.registry.snapshot();
        let probe = build_probe(&entries, &self.identity);
        if probe.is_empty() {
            return Ok(CycleOutcome::Idle);
        }
        let no_hangup = !probe.initializing.is_empty();

        let changed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Ok(CycleOutcome::Stopped),
            result = self.fetcher.check_update(&probe.payload, no_hangup) => result?,
        };
        if self.shutdown.is_requested() {
            return Ok(CycleOutcome::Stopped);
        }

        let changed_count = changed.len();
        CHANGED_KEYS.inc_by(changed_count as u64);
        for changed_key in changed {
            for entry in self.resolve(&changed_key) {
                self.refresh(&entry).await;
            }
        }
        if self.shutdown.is_requested() {
            return Ok(CycleOutcome::Stopped);
        }

        let sent_initializing: HashSet<GroupKey> = probe.initializing.into_iter().collect();
        for entry in &entries {
            if !entry.is_initializing() || sent_initializing.contains(entry.group_key()) {
                entry.notify_listeners();
                entry.set_initializing(false);
            }
        }

        Ok(CycleOutcome::Completed {
            changed: changed_count,
        })
    }

    /// Entries addressed by a changed key; a key without tenant matches every namespace.
    fn resolve(
        &self,
        changed_key: &ChangedKey,
    ) -> Vec<Arc<CacheEntry>> {
        match &changed_key.tenant {
            Some(tenant) => {
                match GroupKey::new(tenant.as_str(), changed_key.group.as_str(), changed_key.key.as_str()) {
                    Ok(group_key) => self.registry.get(&group_key).into_iter().collect(),
                    Err(e) => {
                        warn!("ignoring changed key {:?}: {}", changed_key, e);
                        Vec::new()
                    }
                }
            }
            None => self
                .registry
                .find_by_key_and_group(&changed_key.key, &changed_key.group),
        }
    }

    async fn refresh(
        &self,
        entry: &CacheEntry,
    ) {
        match self.fetcher.fetch_config(entry.group_key()).await {
            Ok(content) => {
                if entry.set_content(content) {
                    info!(group_key = %entry.group_key(), "config changed");
                }
            }
            Err(e) => {
                CONFIG_FETCH_FAILURES.inc();
                warn!(group_key = %entry.group_key(), "fetch failed, keeping stale content: {}", e);
            }
        }
    }

    async fn pause(
        &self,
        delay: Duration,
    ) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
