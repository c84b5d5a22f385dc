//! Callbacks notified when a watched entry's content changes.

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::metrics::LISTENER_FAILURES;
use crate::metrics::LISTENER_INVOCATIONS;

/// Receives the current content of a watched entry.
///
/// Listeners run synchronously on the long-poll task, so a slow listener
/// delays the next poll cycle. Hand heavy work off to another task if that
/// matters. A panicking listener is logged and skipped; the remaining
/// listeners and the poll loop keep running.
pub trait Listener: Send + Sync + 'static {
    fn receive_config_info(
        &self,
        content: &str,
    );
}

impl<F> Listener for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn receive_config_info(
        &self,
        content: &str,
    ) {
        self(content)
    }
}

/// A registered listener plus the fingerprint it was last notified with.
pub(crate) struct ListenerWrap {
    listener: Arc<dyn Listener>,
    last_fingerprint: Mutex<Option<String>>,
}

impl ListenerWrap {
    pub(crate) fn new(listener: Arc<dyn Listener>) -> Self {
        Self {
            listener,
            last_fingerprint: Mutex::new(None),
        }
    }

    /// Invokes the listener unless it already saw `fingerprint`.
    ///
    /// Returns `true` when the listener was called, whether or not it panicked.
    pub(crate) fn notify_if_changed(
        &self,
        content: &str,
        fingerprint: &str,
        group_key: &str,
    ) -> bool {
        {
            let mut last = self.last_fingerprint.lock();
            if last.as_deref() == Some(fingerprint) {
                return false;
            }
            *last = Some(fingerprint.to_string());
        }

        LISTENER_INVOCATIONS.inc();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.listener.receive_config_info(content)));
        if let Err(panic) = outcome {
            LISTENER_FAILURES.inc();
            error!(
                group_key,
                "listener panicked while handling new content: {}",
                panic_message(&panic)
            );
        }
        true
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}
