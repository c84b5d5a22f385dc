use std::sync::Arc;

use crate::cache::CacheEntry;
use crate::cache::GroupKey;
use crate::constants::LINE_SEPARATOR;
use crate::constants::WORD_SEPARATOR;

/// Payload of one change-check request.
#[derive(Debug, Default)]
pub(crate) struct Probe {
    pub(crate) payload: String,
    /// Entries asked for with the no-hangup hint
    pub(crate) initializing: Vec<GroupKey>,
}

impl Probe {
    pub(crate) fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// One line per entry: `key ␂ group ␂ namespace ␂ identity ␂ fingerprint ␁`.
pub(crate) fn build_probe(
    entries: &[Arc<CacheEntry>],
    identity: &str,
) -> Probe {
    let mut probe = Probe::default();
    for entry in entries {
        let group_key = entry.group_key();
        for field in [
            group_key.key(),
            group_key.group(),
            group_key.namespace(),
            identity,
        ] {
            probe.payload.push_str(field);
            probe.payload.push(WORD_SEPARATOR);
        }
        probe.payload.push_str(&entry.fingerprint());
        probe.payload.push(LINE_SEPARATOR);

        if entry.is_initializing() {
            probe.initializing.push(group_key.clone());
        }
    }
    probe
}
