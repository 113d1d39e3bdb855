//! Integration tests for `TelegramClient` using wiremock HTTP mocks.

use bytes::Bytes;
use reelsync_telegram::{TelegramClient, TelegramError};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> TelegramClient {
    TelegramClient::with_base_url("123:ABC", 15, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn send_message_succeeds_on_ok_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": 1}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client
        .send_message("-1001234", "hello")
        .await
        .expect("send_message should succeed");
}

#[tokio::test]
async fn send_message_surfaces_api_description() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.send_message("-1001234", "hello").await;

    match result {
        Err(TelegramError::Api { description }) => {
            assert!(description.contains("chat not found"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn resolve_chat_keeps_working_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let chat = client
        .resolve_chat("-1001234")
        .await
        .expect("probe should succeed");

    assert_eq!(chat, "-1001234");
}

#[tokio::test]
async fn resolve_chat_adopts_migrated_id() {
    let server = MockServer::start().await;

    // First probe: the group was upgraded and the old id is rejected with a
    // migration hint. Second probe (against the new id) succeeds.
    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: group chat was upgraded to a supergroup chat",
            "parameters": {"migrate_to_chat_id": -1009876543210i64}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let chat = client
        .resolve_chat("-1001234")
        .await
        .expect("migration target should be adopted");

    assert_eq!(chat, "-1009876543210");
}

#[tokio::test]
async fn resolve_chat_without_migration_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "description": "Forbidden: bot was kicked from the group chat"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.resolve_chat("-1001234").await;

    assert!(
        matches!(result, Err(TelegramError::ChatUnavailable { .. })),
        "expected ChatUnavailable, got: {result:?}"
    );
}

#[tokio::test]
async fn send_video_uploads_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendVideo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client
        .send_video(
            "-1001234",
            Bytes::from_static(b"not really mp4"),
            "ABC123.mp4",
            "caption text",
        )
        .await
        .expect("send_video should succeed");
}

#[tokio::test]
async fn download_returns_body_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/media/v.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"videobytes".to_vec()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let bytes = client
        .download(&format!("{}/media/v.mp4", server.uri()))
        .await
        .expect("download should succeed");

    assert_eq!(&bytes[..], b"videobytes");
}
