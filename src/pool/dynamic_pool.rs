use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;
use tracing::warn;

use super::ThreadPoolParameter;
use crate::Listener;

/// Stable handle to the current parameters of one thread pool.
///
/// Executor adapters read [`parameters`](Self::parameters) whenever they
/// need to; the long-poll loop swaps in new values through the listener
/// returned by [`refresh_listener`](Self::refresh_listener).
#[derive(Debug)]
pub struct DynamicPool {
    tp_id: String,
    parameters: ArcSwap<ThreadPoolParameter>,
}

impl DynamicPool {
    pub fn new(tp_id: impl Into<String>) -> Arc<Self> {
        let tp_id = tp_id.into();
        let initial = ThreadPoolParameter {
            tp_id: tp_id.clone(),
            ..Default::default()
        };
        Arc::new(Self {
            tp_id,
            parameters: ArcSwap::from_pointee(initial),
        })
    }

    pub fn tp_id(&self) -> &str {
        &self.tp_id
    }

    pub fn parameters(&self) -> Arc<ThreadPoolParameter> {
        self.parameters.load_full()
    }

    /// Parses `content` and swaps it in. Unparseable content is logged and
    /// leaves the current parameters in place.
    pub fn apply(
        &self,
        content: &str,
    ) -> bool {
        let next = match ThreadPoolParameter::from_content(content) {
            Ok(next) => next,
            Err(e) => {
                warn!(tp_id = %self.tp_id, "ignoring unparseable pool parameters: {}", e);
                return false;
            }
        };

        let previous = self.parameters.swap(Arc::new(next.clone()));
        let changes = previous.diff(&next);
        if changes.is_empty() {
            info!(tp_id = %self.tp_id, "pool parameters refreshed, no tunable changed");
        } else {
            info!(tp_id = %self.tp_id, "pool parameters changed: {}", changes.join(", "));
        }
        true
    }

    pub fn refresh_listener(self: &Arc<Self>) -> Arc<dyn Listener> {
        let pool = Arc::clone(self);
        Arc::new(move |content: &str| {
            pool.apply(content);
        })
    }
}
