use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use md5::Digest;
use md5::Md5;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tracing::trace;

use super::GroupKey;
use crate::constants::NULL_FINGERPRINT;
use crate::listener::ListenerWrap;
use crate::Listener;

/// Lowercase hex MD5 of `content`.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
struct ContentState {
    content: String,
    fingerprint: String,
}

/// In-memory record for one watched thread pool.
///
/// Content and fingerprint always change together. Listeners are append-only.
/// `initializing` stays set until a change-check cycle that carried the
/// no-hangup hint for this entry completes.
pub struct CacheEntry {
    group_key: GroupKey,
    state: RwLock<ContentState>,
    listeners: Mutex<Vec<Arc<ListenerWrap>>>,
    initializing: AtomicBool,
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("group_key", &self.group_key)
            .field("fingerprint", &self.fingerprint())
            .field("listeners", &self.listener_count())
            .field("initializing", &self.is_initializing())
            .finish()
    }
}

impl CacheEntry {
    pub fn new(group_key: GroupKey) -> Self {
        Self {
            group_key,
            state: RwLock::new(ContentState {
                content: String::new(),
                fingerprint: NULL_FINGERPRINT.to_string(),
            }),
            listeners: Mutex::new(Vec::new()),
            initializing: AtomicBool::new(true),
        }
    }

    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }

    pub fn content(&self) -> String {
        self.state.read().content.clone()
    }

    pub fn fingerprint(&self) -> String {
        self.state.read().fingerprint.clone()
    }

    /// Content has been fetched from the server at least once.
    pub fn is_populated(&self) -> bool {
        self.state.read().fingerprint != NULL_FINGERPRINT
    }

    /// Replaces the content and recomputes the fingerprint.
    ///
    /// Returns `true` if the fingerprint changed.
    pub fn set_content(
        &self,
        content: String,
    ) -> bool {
        let new_fingerprint = fingerprint(&content);
        let mut state = self.state.write();
        if state.fingerprint == new_fingerprint {
            return false;
        }
        trace!(group_key = %self.group_key, fingerprint = %new_fingerprint, "content updated");
        state.content = content;
        state.fingerprint = new_fingerprint;
        true
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn Listener>,
    ) {
        self.listeners.lock().push(Arc::new(ListenerWrap::new(listener)));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Acquire)
    }

    pub fn set_initializing(
        &self,
        initializing: bool,
    ) {
        self.initializing.store(initializing, Ordering::Release);
    }

    /// Calls every listener that has not yet seen the current fingerprint.
    ///
    /// Never-fetched content is not delivered. Listeners are called outside
    /// the listener lock so they may register further listeners.
    /// Returns how many listeners were invoked.
    pub fn notify_listeners(&self) -> usize {
        let ContentState { content, fingerprint } = self.state.read().clone();
        if fingerprint == NULL_FINGERPRINT {
            return 0;
        }

        let listeners: Vec<Arc<ListenerWrap>> = self.listeners.lock().clone();
        let group_key = self.group_key.to_wire();
        listeners
            .iter()
            .filter(|wrap| wrap.notify_if_changed(&content, &fingerprint, &group_key))
            .count()
    }
}
