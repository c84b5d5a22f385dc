use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tracing::warn;

use crate::Result;
use crate::TransportError;

/// Ordered server addresses with a cursor on the one currently in use.
#[derive(Debug)]
pub struct ServerListManager {
    addresses: Vec<String>,
    cursor: AtomicUsize,
}

impl ServerListManager {
    pub fn new(addresses: Vec<String>) -> Self {
        let addresses = addresses
            .into_iter()
            .map(|address| address.trim_end_matches('/').to_string())
            .filter(|address| !address.is_empty())
            .collect();
        Self {
            addresses,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> Result<&str> {
        if self.addresses.is_empty() {
            return Err(TransportError::NoServerAvailable.into());
        }
        let index = self.cursor.load(Ordering::Acquire) % self.addresses.len();
        Ok(&self.addresses[index])
    }

    /// Moves to the next address after `failed`, unless another caller
    /// already moved past it.
    pub fn rotate_from(
        &self,
        failed: &str,
    ) {
        let len = self.addresses.len();
        if len < 2 {
            return;
        }
        let observed = self.cursor.load(Ordering::Acquire);
        if self.addresses[observed % len] != failed {
            return;
        }
        if self
            .cursor
            .compare_exchange(observed, (observed + 1) % len, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!(
                "server {} failed, switching to {}",
                failed,
                self.addresses[(observed + 1) % len]
            );
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
