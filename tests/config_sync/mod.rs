use std::time::Duration;

use poolwatch::AgentBuilder;
use serde_json::json;
use wiremock::matchers::header_exists;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::Mock;
use wiremock::MockServer;

use crate::common::*;

async fn mount_config(
    server: &MockServer,
    core_size: u32,
) {
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/configs")))
        .and(query_param("tpId", TP_ID))
        .and(query_param("namespace", NAMESPACE))
        .respond_with(ok(pool_json(core_size)))
        .mount(server)
        .await;
}

async fn mount_quiet_listener(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/configs/listener")))
        .and(header_exists("Long-Pulling-Timeout-No-Hangup"))
        .respond_with(ok(json!("")))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/configs/listener")))
        .respond_with(ok(json!("")).set_delay(Duration::from_millis(200)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_changed_pool_reaches_dynamic_pool() {
    enable_logger();
    let server = MockServer::start().await;
    mount_config(&server, 2).await;
    mount_quiet_listener(&server).await;

    let agent = AgentBuilder::new(client_config(&server.uri()))
        .identity(IDENTITY)
        .build()
        .await
        .unwrap();
    let pool = agent.watch_pool(TP_ID).await.unwrap();
    agent.notify_application_complete();

    let watched = &pool;
    let seen = eventually(Duration::from_secs(3), || async move {
        watched.parameters().core_size == Some(2)
    })
    .await;
    assert!(seen);

    // Server now reports the pool changed and serves the new definition
    server.reset().await;
    mount_config(&server, 8).await;
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/configs/listener")))
        .respond_with(
            ok(json!(format!("{TP_ID}%02{ITEM_ID}%02{NAMESPACE}%01"))).set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let seen = eventually(Duration::from_secs(3), || async move {
        watched.parameters().core_size == Some(8)
    })
    .await;
    assert!(seen);
    assert_eq!(pool.parameters().max_size, Some(16));

    assert!(agent.shutdown().await);
}

#[tokio::test]
async fn test_probe_carries_identity_and_fingerprint() {
    enable_logger();
    let server = MockServer::start().await;
    mount_config(&server, 4).await;
    mount_quiet_listener(&server).await;

    let agent = AgentBuilder::new(client_config(&server.uri()))
        .identity(IDENTITY)
        .build()
        .await
        .unwrap();
    let entry = agent
        .worker()
        .add_listeners(NAMESPACE, ITEM_ID, TP_ID, vec![])
        .await
        .unwrap();
    agent.notify_application_complete();

    let listener_path = format!("{BASE}/configs/listener");
    let (mock, wanted) = (&server, listener_path.as_str());
    let received_probe = eventually(Duration::from_secs(3), || async move {
        mock.received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|request| request.url.path() == wanted)
    })
    .await;
    assert!(received_probe);

    let requests = server.received_requests().await.unwrap();
    let probe = requests
        .iter()
        .find(|request| request.url.path() == listener_path)
        .unwrap();
    let body = String::from_utf8_lossy(&probe.body);
    let expected = format!(
        "Listening-Configs={TP_ID}%02{ITEM_ID}%02{NAMESPACE}%02127.0.0.1%3A8088_it%02{}%01",
        entry.fingerprint()
    );
    assert!(body.contains(&expected), "unexpected probe body {body}");
    assert_eq!(
        probe.headers.get("Long-Pulling-Timeout").unwrap().to_str().unwrap(),
        "300"
    );
    assert_eq!(
        probe
            .headers
            .get("Long-Pulling-Client-Identification")
            .unwrap()
            .to_str()
            .unwrap(),
        IDENTITY
    );

    assert!(agent.shutdown().await);
}

#[tokio::test]
async fn test_unreachable_server_does_not_block_shutdown() {
    enable_logger();
    let mut config = client_config("http://127.0.0.1:1");
    config.long_poll.timeout_in_ms = 1_000;

    let agent = AgentBuilder::new(config).identity(IDENTITY).build().await.unwrap();
    let entry = agent
        .worker()
        .add_listeners(NAMESPACE, ITEM_ID, TP_ID, vec![])
        .await
        .unwrap();
    assert!(!entry.is_populated());
    agent.notify_application_complete();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(agent.shutdown().await);
}
