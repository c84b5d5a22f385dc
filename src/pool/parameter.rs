use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ProtocolError;
use crate::Result;

/// Thread-pool definition served by the control server.
///
/// Unknown server fields are dropped on parse, so [`normalized_content`]
/// only changes when one of these fields does.
///
/// [`normalized_content`]: Self::normalized_content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadPoolParameter {
    pub tenant_id: String,
    pub item_id: String,
    pub tp_id: String,
    pub core_size: Option<u32>,
    pub max_size: Option<u32>,
    pub queue_type: Option<u32>,
    pub capacity: Option<u32>,
    pub keep_alive_time: Option<u64>,
    pub execute_time_out: Option<u64>,
    pub rejected_type: Option<u32>,
    pub is_alarm: Option<u32>,
    pub capacity_alarm: Option<u32>,
    pub liveness_alarm: Option<u32>,
    pub allow_core_thread_time_out: Option<u32>,
}

impl ThreadPoolParameter {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value).map_err(ProtocolError::Json)?)
    }

    pub fn from_content(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content).map_err(ProtocolError::Json)?)
    }

    /// Canonical JSON rendering stored in the cache and fingerprinted.
    pub fn normalized_content(&self) -> Result<String> {
        Ok(serde_json::to_string(self).map_err(ProtocolError::Json)?)
    }

    /// Human-readable `field: old => new` lines for every tunable that differs.
    pub fn diff(
        &self,
        other: &Self,
    ) -> Vec<String> {
        let mut changes = Vec::new();
        let mut compare = |name: &str, old: Option<u64>, new: Option<u64>| {
            if old != new {
                changes.push(format!("{name}: {} => {}", display(old), display(new)));
            }
        };

        compare("coreSize", widen(self.core_size), widen(other.core_size));
        compare("maxSize", widen(self.max_size), widen(other.max_size));
        compare("queueType", widen(self.queue_type), widen(other.queue_type));
        compare("capacity", widen(self.capacity), widen(other.capacity));
        compare("keepAliveTime", self.keep_alive_time, other.keep_alive_time);
        compare("executeTimeOut", self.execute_time_out, other.execute_time_out);
        compare("rejectedType", widen(self.rejected_type), widen(other.rejected_type));
        compare(
            "allowCoreThreadTimeOut",
            widen(self.allow_core_thread_time_out),
            widen(other.allow_core_thread_time_out),
        );
        changes
    }
}

fn widen(value: Option<u32>) -> Option<u64> {
    value.map(u64::from)
}

fn display(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
