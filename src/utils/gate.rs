use tokio::sync::watch;

/// A signal that opens once and stays open.
///
/// Waiters that arrive after the gate opened return immediately.
#[derive(Debug, Clone)]
pub struct OneShotGate {
    tx: watch::Sender<bool>,
}

impl Default for OneShotGate {
    fn default() -> Self {
        Self::new()
    }
}

impl OneShotGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Opens the gate. Returns `true` only for the call that opened it.
    pub fn open(&self) -> bool {
        self.tx.send_if_modified(|opened| {
            if *opened {
                false
            } else {
                *opened = true;
                true
            }
        })
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the gate is open.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|opened| *opened).await;
    }
}
