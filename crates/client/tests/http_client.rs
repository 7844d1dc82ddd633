//! HTTP client and poller against a mock dashboard server.

use mcdash_client::{DashboardClient, LoginError, StatusPoller, StatusReport};
use mcdash_net::{encode_status, PlayerSummary, ServerStatus, SkinBlock, SKIN_BYTES};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DashboardClient {
    DashboardClient::new(server.uri(), Duration::from_secs(5)).unwrap()
}

fn sample() -> ServerStatus {
    ServerStatus {
        online: 2,
        max: 20,
        players: vec![
            PlayerSummary {
                id: 1,
                name: "{gold}Steve".into(),
                skin: Some(SkinBlock::from_slice(&[9; SKIN_BYTES]).unwrap()),
            },
            PlayerSummary {
                id: 2,
                name: "alex".into(),
                skin: None,
            },
        ],
    }
}

#[tokio::test]
async fn status_payload_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encode_status(&sample()).unwrap()))
        .mount(&server)
        .await;

    let decoded = client(&server).fetch_status().await.unwrap().unwrap();
    assert_eq!(decoded.into_result().unwrap(), sample());
}

#[tokio::test]
async fn empty_status_means_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client(&server).fetch_status().await.unwrap().is_none());
}

#[tokio::test]
async fn poller_treats_server_errors_as_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dashboard = client(&server);
    assert!(dashboard.fetch_status().await.is_err());
    let mut poller = StatusPoller::new(dashboard, Duration::from_millis(10));
    assert_eq!(poller.poll_once().await, StatusReport::Offline);
}

#[tokio::test]
async fn player_detail_is_fetched() {
    let server = MockServer::start().await;
    let skin = SkinBlock::from_slice(&[3; SKIN_BYTES]).unwrap();
    Mock::given(method("GET"))
        .and(path("/player_1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "steve",
            "display": "{gold}Steve",
            "version": "1.20.1",
            "skin": skin.to_base64(),
        })))
        .mount(&server)
        .await;

    let detail = client(&server).fetch_player(1).await.unwrap();
    assert_eq!(detail.display, "{gold}Steve");
    assert_eq!(detail.skin, Some(skin));
    assert!(detail.show_account_name());

    assert!(client(&server).fetch_player(2).await.is_err());
}

#[tokio::test]
async fn login_returns_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "key": "k3y",
        })))
        .mount(&server)
        .await;

    assert_eq!(client(&server).login("hunter2").await.unwrap(), "k3y");
}

#[tokio::test]
async fn login_failures_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "password": "wrong" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "wrong_password",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "password": "busy" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "limit",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "password": "html" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("<h1>oops</h1>"))
        .mount(&server)
        .await;

    let dashboard = client(&server);
    assert!(matches!(
        dashboard.login("wrong").await,
        Err(LoginError::WrongPassword)
    ));
    assert!(matches!(
        dashboard.login("busy").await,
        Err(LoginError::LimitReached)
    ));
    assert!(matches!(
        dashboard.login("html").await,
        Err(LoginError::Unknown(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dashboard = DashboardClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    assert!(matches!(
        dashboard.login("x").await,
        Err(LoginError::Network(_))
    ));
}
