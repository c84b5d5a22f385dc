use std::future::Future;
use std::time::Duration;

use poolwatch::ClientConfig;
use serde_json::json;
use serde_json::Value;
use wiremock::ResponseTemplate;

pub const NAMESPACE: &str = "prescription";
pub const ITEM_ID: &str = "dynamic-threadpool-example";
pub const TP_ID: &str = "message-consume";
pub const IDENTITY: &str = "127.0.0.1:8088_it";

pub const BASE: &str = "/hippo4j/v1/cs";

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

/// Client configuration pointing at `server_uri` with short timings.
pub fn client_config(server_uri: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.server.addresses = vec![server_uri.to_string()];
    config.long_poll.timeout_in_ms = 300;
    config.long_poll.failure_backoff_in_ms = 50;
    config.health.enabled = false;
    config.discovery.enabled = false;
    config.discovery.heartbeat_interval_in_secs = 1;
    config.discovery.shutdown_await_in_ms = 1_000;
    config.application.app_name = "order-service".to_string();
    config.application.namespace = NAMESPACE.to_string();
    config.application.item_id = ITEM_ID.to_string();
    config.application.host = Some("127.0.0.1".to_string());
    config.application.port = 8088;
    config
}

pub fn pool_json(core_size: u32) -> Value {
    json!({
        "tenantId": NAMESPACE,
        "itemId": ITEM_ID,
        "tpId": TP_ID,
        "coreSize": core_size,
        "maxSize": core_size * 2,
        "queueType": 9,
        "capacity": 1024,
        "keepAliveTime": 60,
        "executeTimeOut": 3000,
        "rejectedType": 2,
        "isAlarm": 1,
        "capacityAlarm": 80,
        "livenessAlarm": 80,
        "allowCoreThreadTimeOut": 0
    })
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": "0", "message": "success", "data": data}))
}

pub fn code(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": code, "message": code}))
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}
