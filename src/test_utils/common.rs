use serde_json::json;
use serde_json::Value;

use crate::cache::GroupKey;
use crate::ThreadPoolParameter;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub fn group_key(
    namespace: &str,
    group: &str,
    key: &str,
) -> GroupKey {
    GroupKey::new(namespace, group, key).unwrap()
}

/// Server-side JSON for a pool with the given core size.
pub fn pool_json(
    group_key: &GroupKey,
    core_size: u32,
) -> Value {
    json!({
        "tenantId": group_key.namespace(),
        "itemId": group_key.group(),
        "tpId": group_key.key(),
        "coreSize": core_size,
        "maxSize": core_size * 2,
        "queueType": 9,
        "capacity": 512,
        "keepAliveTime": 60,
        "executeTimeOut": 1000,
        "rejectedType": 2,
        "isAlarm": 0,
        "capacityAlarm": 80,
        "livenessAlarm": 80,
        "allowCoreThreadTimeOut": 0
    })
}

/// The content the cache stores for [`pool_json`].
pub fn pool_content(
    group_key: &GroupKey,
    core_size: u32,
) -> String {
    ThreadPoolParameter::from_value(pool_json(group_key, core_size))
        .unwrap()
        .normalized_content()
        .unwrap()
}
