use std::time::Duration;

use poolwatch::AgentBuilder;
use poolwatch::DiscoveryState;
use serde_json::json;
use serde_json::Value;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::Request;

use crate::common::*;

const REGISTER: &str = "/apps/register/";
const RENEW: &str = "/apps/renew";
const CLOSE: &str = "/client/close";

async fn bodies(
    server: &MockServer,
    endpoint: &str,
) -> Vec<Value> {
    let wanted = format!("{BASE}{endpoint}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == wanted)
        .map(|request: &Request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

async fn mount(
    server: &MockServer,
    endpoint: &str,
    response: wiremock::ResponseTemplate,
) {
    Mock::given(method("POST"))
        .and(path(format!("{BASE}{endpoint}")))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_renew_not_found_triggers_re_registration() {
    enable_logger();
    let server = MockServer::start().await;
    mount(&server, REGISTER, ok(json!(null))).await;
    mount(&server, RENEW, code("A000404")).await;
    mount(&server, CLOSE, ok(json!(null))).await;

    let mut config = client_config(&server.uri());
    config.discovery.enabled = true;
    let agent = AgentBuilder::new(config).identity(IDENTITY).build().await.unwrap();
    assert!(agent.discovery().is_some());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(agent.shutdown().await);

    let registers = bodies(&server, REGISTER).await;
    let renews = bodies(&server, RENEW).await;
    assert!(!renews.is_empty());
    assert_eq!(registers.len(), renews.len() + 1);

    let register = &registers[0];
    assert_eq!(register["appName"], "order-service");
    assert_eq!(register["instanceId"], "127.0.0.1:order-service:8088");
    assert_eq!(register["groupKey"], format!("{ITEM_ID}+{NAMESPACE}"));
    assert_eq!(register["identify"], IDENTITY);
    assert_eq!(register["status"], "UP");

    // Re-registration carries the dirty timestamp the renew failure set
    let dirty = registers[1]["lastDirtyTimestamp"].as_u64().unwrap();
    assert!(dirty > register["lastDirtyTimestamp"].as_u64().unwrap());

    let closes = bodies(&server, CLOSE).await;
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0]["groupKey"], format!("{ITEM_ID}+{NAMESPACE}+{IDENTITY}"));
}

#[tokio::test]
async fn test_accepted_renew_keeps_single_registration() {
    enable_logger();
    let server = MockServer::start().await;
    mount(&server, REGISTER, ok(json!(null))).await;
    mount(&server, RENEW, ok(json!(null))).await;
    mount(&server, CLOSE, ok(json!(null))).await;

    let mut config = client_config(&server.uri());
    config.discovery.enabled = true;
    let agent = AgentBuilder::new(config).identity(IDENTITY).build().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let discovery = agent.discovery().unwrap().clone();
    assert_eq!(discovery.state(), DiscoveryState::Registered);
    assert!(discovery.last_successful_heartbeat() > 0);

    assert!(agent.shutdown().await);
    assert_eq!(bodies(&server, REGISTER).await.len(), 1);
    assert!(!bodies(&server, RENEW).await.is_empty());
    assert_eq!(bodies(&server, CLOSE).await.len(), 1);
}

#[tokio::test]
async fn test_shutdown_stays_within_one_await_timeout() {
    enable_logger();
    let server = MockServer::start().await;
    mount(&server, REGISTER, ok(json!(null))).await;
    mount(
        &server,
        RENEW,
        ok(json!(null)).set_delay(Duration::from_secs(5)),
    )
    .await;
    mount(
        &server,
        CLOSE,
        ok(json!(null)).set_delay(Duration::from_secs(5)),
    )
    .await;

    let mut config = client_config(&server.uri());
    config.discovery.enabled = true;
    let agent = AgentBuilder::new(config).identity(IDENTITY).build().await.unwrap();

    // Let the first renew start and hang on the server
    tokio::time::sleep(Duration::from_millis(1_300)).await;

    let started = std::time::Instant::now();
    let clean = agent.shutdown().await;
    let elapsed = started.elapsed();

    assert!(!clean);
    assert!(elapsed < Duration::from_millis(1_800), "shutdown took {elapsed:?}");
}
