use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::body_json;
use wiremock::matchers::body_string_contains;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

use super::*;
use crate::Error;
use crate::ServerConfig;
use crate::TransportError;

fn server_config(addresses: Vec<String>) -> ServerConfig {
    ServerConfig {
        addresses,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_post_by_config_sends_form_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hippo4j/v1/cs/configs/listener"))
        .and(header("Long-Pulling-Timeout", "30000"))
        .and(body_string_contains("Listening-Configs=tp1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "0", "data": ""})))
        .expect(1)
        .mount(&server)
        .await;

    let agent = ServerHttpAgent::new(&server_config(vec![server.uri()])).unwrap();
    let headers = HashMap::from([("Long-Pulling-Timeout".to_string(), "30000".to_string())]);
    let params = HashMap::from([("Listening-Configs".to_string(), "tp1".to_string())]);

    let result = agent
        .post_by_config("/configs/listener", headers, params, Duration::from_secs(2))
        .await
        .unwrap();

    assert!(result.is_success());
}

#[tokio::test]
async fn test_get_by_config_sends_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hippo4j/v1/cs/configs"))
        .and(query_param("tpId", "tp1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": "0", "data": {"tpId": "tp1"}})),
        )
        .mount(&server)
        .await;

    let agent = ServerHttpAgent::new(&server_config(vec![server.uri()])).unwrap();
    let params = HashMap::from([("tpId".to_string(), "tp1".to_string())]);

    let result = agent
        .get_by_config("/configs", HashMap::new(), params, Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(result.data, Some(json!({"tpId": "tp1"})));
}

#[tokio::test]
async fn test_post_by_discovery_sends_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hippo4j/v1/cs/apps/renew"))
        .and(body_json(json!({"appName": "app"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "A000404"})))
        .mount(&server)
        .await;

    let agent = ServerHttpAgent::new(&server_config(vec![server.uri()])).unwrap();
    let result = agent.post_by_discovery("/apps/renew", json!({"appName": "app"})).await.unwrap();

    assert!(result.is_not_found());
}

#[tokio::test]
async fn test_slow_server_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": "0"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let agent = ServerHttpAgent::new(&server_config(vec![server.uri()])).unwrap();
    let result = agent
        .post_by_config(
            "/configs/listener",
            HashMap::new(),
            HashMap::new(),
            Duration::from_millis(100),
        )
        .await;

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::Timeout { .. }))
    ));
}

#[tokio::test]
async fn test_http_error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let agent = ServerHttpAgent::new(&server_config(vec![server.uri()])).unwrap();
    let result = agent
        .get_by_config("/health/check", HashMap::new(), HashMap::new(), Duration::from_secs(1))
        .await;

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::HttpStatus { status: 503, .. }))
    ));
}

#[tokio::test]
async fn test_connection_failure_fails_over_to_next_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "0", "data": "UP"})))
        .mount(&server)
        .await;

    // Port 1 refuses connections
    let agent =
        ServerHttpAgent::new(&server_config(vec!["http://127.0.0.1:1".to_string(), server.uri()]))
            .unwrap();

    let first = agent
        .get_by_config("/health/check", HashMap::new(), HashMap::new(), Duration::from_secs(1))
        .await;
    assert!(first.unwrap_err().is_transport());

    let second = agent
        .get_by_config("/health/check", HashMap::new(), HashMap::new(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(second.data_str(), Some("UP"));
}

#[tokio::test]
async fn test_malformed_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let agent = ServerHttpAgent::new(&server_config(vec![server.uri()])).unwrap();
    let result = agent
        .get_by_config("/configs", HashMap::new(), HashMap::new(), Duration::from_secs(1))
        .await;

    assert!(matches!(result, Err(Error::Protocol(_))));
}
