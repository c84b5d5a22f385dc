use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ConfigFetcher;
use super::LongPollLoop;
use crate::cache::CacheEntry;
use crate::cache::CacheRegistry;
use crate::cache::GroupKey;
use crate::Error;
use crate::HttpAgent;
use crate::Listener;
use crate::LongPollConfig;
use crate::OneShotGate;
use crate::Result;
use crate::ServerHealthCheck;
use crate::ShutdownGate;

/// Entry point of the long-polling configuration client.
///
/// Owns the cache registry and the background poll task. The task starts
/// once [`notify_application_complete`](Self::notify_application_complete)
/// is called, and then only polls when at least one entry is watched.
pub struct ClientWorker {
    registry: Arc<CacheRegistry>,
    fetcher: Arc<ConfigFetcher>,
    identity: String,
    shutdown: ShutdownGate,
    application_complete: OneShotGate,
    cache_ready: OneShotGate,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ClientWorker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClientWorker")
            .field("identity", &self.identity)
            .field("entries", &self.registry.len())
            .field("application_complete", &self.application_complete.is_open())
            .finish()
    }
}

impl ClientWorker {
    /// Creates the worker and spawns its poll task. Must be called inside a
    /// tokio runtime.
    pub fn new(
        agent: Arc<dyn HttpAgent>,
        identity: String,
        health: Arc<dyn ServerHealthCheck>,
        shutdown: ShutdownGate,
        config: LongPollConfig,
    ) -> Arc<Self> {
        let registry = Arc::new(CacheRegistry::new());
        let fetcher = Arc::new(ConfigFetcher::new(agent, identity.clone(), config));
        let application_complete = OneShotGate::new();
        let cache_ready = OneShotGate::new();

        let poll_loop = LongPollLoop {
            registry: registry.clone(),
            fetcher: fetcher.clone(),
            health,
            shutdown: shutdown.clone(),
            cache_ready: cache_ready.clone(),
            identity: identity.clone(),
        };
        let started = application_complete.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = poll_loop.shutdown.cancelled() => {}
                _ = started.wait() => {}
            }
            poll_loop.run().await;
        });

        Arc::new(Self {
            registry,
            fetcher,
            identity,
            shutdown,
            application_complete,
            cache_ready,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    /// Registers `listeners` on the entry for `(namespace, item_id, tp_id)`,
    /// creating and fetching the entry on first use.
    pub async fn add_listeners(
        &self,
        namespace: &str,
        item_id: &str,
        tp_id: &str,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Result<Arc<CacheEntry>> {
        if self.shutdown.is_requested() {
            return Err(Error::Shutdown);
        }
        let group_key = GroupKey::new(namespace, item_id, tp_id)?;
        let entry = self.add_cache_entry_if_absent(group_key).await;
        for listener in listeners {
            entry.add_listener(listener);
        }

        if self.application_complete.is_open() && self.cache_ready.open() {
            debug!("first entry watched after start-up, releasing poll loop");
        }
        Ok(entry)
    }

    /// Returns the entry for `group_key`, creating it and running its
    /// initial fetch if absent.
    pub async fn add_cache_entry_if_absent(
        &self,
        group_key: GroupKey,
    ) -> Arc<CacheEntry> {
        let fetcher = self.fetcher.clone();
        let fetch_key = group_key.clone();
        self.registry
            .get_or_create(group_key, move || async move { fetcher.fetch_config(&fetch_key).await })
            .await
    }

    /// Releases the poll task. Later calls are no-ops.
    pub fn notify_application_complete(&self) {
        if self.application_complete.open() {
            info!(identity = %self.identity, "application started, long polling enabled");
            if !self.registry.is_empty() {
                self.cache_ready.open();
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Stops the poll task, waiting up to `timeout` for it to acknowledge.
    /// Returns whether it stopped in time; a late task is aborted.
    pub async fn shutdown(
        &self,
        timeout: Duration,
    ) -> bool {
        let acknowledged = self.shutdown.shutdown(timeout).await;
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if acknowledged {
                if let Err(e) = handle.await {
                    warn!("poll task ended abnormally: {}", e);
                }
            } else {
                handle.abort();
            }
        }
        acknowledged
    }
}
