use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use super::OneShotGate;

/// Cooperative shutdown signal shared by the owning process and the poll loop.
///
/// The owner calls [`shutdown`](Self::shutdown); the loop checks
/// [`check_and_acknowledge`](Self::check_and_acknowledge) at the top of each
/// cycle and confirms it stopped. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownGate {
    token: CancellationToken,
    acknowledged: OneShotGate,
}

impl ShutdownGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Marks shutdown as requested without waiting.
    pub fn request(&self) {
        self.token.cancel();
    }

    /// Returns `true` if shutdown was requested, recording that the loop saw it.
    pub fn check_and_acknowledge(&self) -> bool {
        if self.token.is_cancelled() {
            self.acknowledged.open();
            return true;
        }
        false
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.is_open()
    }

    /// Requests shutdown and waits up to `timeout` for the loop to acknowledge.
    ///
    /// Returns whether the acknowledgement arrived in time.
    pub async fn shutdown(
        &self,
        timeout: Duration,
    ) -> bool {
        self.request();
        match tokio::time::timeout(timeout, self.acknowledged.wait()).await {
            Ok(()) => {
                info!("client loop acknowledged shutdown");
                true
            }
            Err(_) => {
                warn!("client loop did not acknowledge shutdown within {:?}", timeout);
                false
            }
        }
    }

    /// Resolves once shutdown is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Token cancelled with this gate, for tasks that do not acknowledge.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
