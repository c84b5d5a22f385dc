//! Server health tracking.
//!
//! The long-poll loop waits on [`ServerHealthCheck::wait_until_healthy`]
//! before each cycle and reports transport failures through
//! [`ServerHealthCheck::set_health_status`].
mod scheduled;

pub use scheduled::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::trace;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServerHealthCheck: Send + Sync + 'static {
    fn is_healthy(&self) -> bool;

    fn set_health_status(
        &self,
        healthy: bool,
    );

    /// Resolves once the server is considered healthy.
    async fn wait_until_healthy(&self);
}

/// Used when probing is disabled: the server is always considered healthy.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysHealthy;

#[async_trait]
impl ServerHealthCheck for AlwaysHealthy {
    fn is_healthy(&self) -> bool {
        true
    }

    fn set_health_status(
        &self,
        healthy: bool,
    ) {
        trace!(healthy, "health probing disabled, status ignored");
    }

    async fn wait_until_healthy(&self) {}
}
