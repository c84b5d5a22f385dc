use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;
use tracing::error;

use super::CacheEntry;
use super::GroupKey;
use crate::Result;

/// Concurrent map from group key to its [`CacheEntry`].
///
/// Creation goes through a per-key once-cell: the first caller for a key
/// constructs the entry and runs its initial fetch, concurrent callers for the
/// same key wait for that and receive the same entry. An entry is only
/// visible to [`snapshot`](Self::snapshot) once fully constructed. Entries
/// live as long as the registry.
#[derive(Default)]
pub struct CacheRegistry {
    entries: DashMap<GroupKey, Arc<OnceCell<Arc<CacheEntry>>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `group_key`, creating and populating it on first use.
    ///
    /// `initial_fetch` runs at most once per key. Its failure is logged and
    /// leaves the entry at its default, never-fetched state.
    pub async fn get_or_create<F, Fut>(
        &self,
        group_key: GroupKey,
        initial_fetch: F,
    ) -> Arc<CacheEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        // Clone the cell out so no shard lock is held across the fetch
        let cell = self.entries.entry(group_key.clone()).or_default().value().clone();

        cell.get_or_init(|| async move {
            let entry = CacheEntry::new(group_key);
            match initial_fetch().await {
                Ok(content) => {
                    entry.set_content(content);
                    debug!(group_key = %entry.group_key(), "cache entry created");
                }
                Err(e) => {
                    error!(
                        group_key = %entry.group_key(),
                        "initial fetch failed, entry stays empty: {}", e
                    );
                }
            }
            Arc::new(entry)
        })
        .await
        .clone()
    }

    pub fn get(
        &self,
        group_key: &GroupKey,
    ) -> Option<Arc<CacheEntry>> {
        self.entries.get(group_key).and_then(|cell| cell.get().cloned())
    }

    /// All published entries, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<CacheEntry>> {
        self.entries.iter().filter_map(|cell| cell.value().get().cloned()).collect()
    }

    /// Published entries whose key and group match, in any namespace.
    pub fn find_by_key_and_group(
        &self,
        key: &str,
        group: &str,
    ) -> Vec<Arc<CacheEntry>> {
        self.snapshot()
            .into_iter()
            .filter(|entry| entry.group_key().key() == key && entry.group_key().group() == group)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of published entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|cell| cell.value().initialized()).count()
    }
}
