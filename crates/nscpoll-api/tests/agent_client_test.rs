#![allow(clippy::unwrap_used)]
// Integration tests for `AgentClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nscpoll_api::{AgentClient, Error, INFO_PATH, TransportConfig, command_path};

// ── Helpers ─────────────────────────────────────────────────────────

const TIMEOUT: Duration = Duration::from_secs(5);

async fn setup() -> (MockServer, AgentClient) {
    let server = MockServer::start().await;
    let client = AgentClient::new(
        Url::parse(&server.uri()).unwrap(),
        "admin".into(),
        SecretString::from("secret".to_owned()),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_info_returns_raw_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "name": "nsclient", "version": "0.5.2" })),
        )
        .mount(&server)
        .await;

    let body = client.query(INFO_PATH, TIMEOUT).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(value["name"], "nsclient");
    assert_eq!(value["version"], "0.5.2");
}

#[tokio::test]
async fn test_credentials_sent_as_basic_auth() {
    let (server, client) = setup().await;

    // base64("admin:secret")
    Mock::given(method("GET"))
        .and(path(command_path("check_cpu")))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client
        .query(&command_path("check_cpu"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(body, "{}");
}

// ── Failure outcomes ────────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_maps_to_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client.query(INFO_PATH, TIMEOUT).await;

    match result {
        Err(Error::Http { status, reason }) => {
            assert_eq!(status, 404);
            assert_eq!(reason, "Not Found");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_200_success_codes_are_failures() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = client.query(INFO_PATH, TIMEOUT).await.unwrap_err();
    assert_eq!(err.http_status(), Some(204));
}

#[tokio::test]
async fn test_slow_agent_times_out() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(INFO_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client
        .query(INFO_PATH, Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Timeout { timeout_ms: 200 }),
        "expected Timeout, got: {err:?}"
    );
    assert_eq!(err.http_status(), Some(408));
}

#[tokio::test]
async fn test_unreachable_agent_is_transport_error() {
    let client = AgentClient::new(
        Url::parse("http://127.0.0.1:1").unwrap(),
        String::new(),
        SecretString::from(String::new()),
        &TransportConfig::default(),
    )
    .unwrap();

    let err = client.query(INFO_PATH, TIMEOUT).await.unwrap_err();

    assert!(
        matches!(err, Error::Transport(_) | Error::Timeout { .. }),
        "expected transport failure, got: {err:?}"
    );
    assert!(err.is_transient());
}
