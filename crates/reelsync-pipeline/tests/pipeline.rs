//! Stage-level integration tests with wiremock standing in for the record
//! store, the social-data provider, and the chat API.

use reelsync_airtable::{AirtableClient, AirtableError};
use reelsync_core::types::AGENCY;
use reelsync_instagram::InstagramClient;
use reelsync_pipeline::{ingest, metrics, notify, PipelineError};
use reelsync_telegram::TelegramClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_client(base_url: &str) -> AirtableClient {
    AirtableClient::with_base_url("test-key", "appBASE", 15, base_url)
        .expect("client construction should not fail")
}

fn provider_client(base_url: &str) -> InstagramClient {
    InstagramClient::with_base_url("rapid-test", 15, 0, 10, base_url)
        .expect("client construction should not fail")
}

fn telegram_client(base_url: &str) -> TelegramClient {
    TelegramClient::with_base_url("123:ABC", 15, base_url)
        .expect("client construction should not fail")
}

fn reel_item(code: &str, taken_at: i64, views: i64) -> Value {
    json!({
        "media": {
            "code": code,
            "taken_at": taken_at,
            "caption": {"text": format!("caption for {code}")},
            "comment_count": 3,
            "play_count": views,
            "like_count": 10,
            "video_versions": [
                {"height": 720, "url": format!("https://cdn.example/{code}.mp4")}
            ]
        }
    })
}

#[tokio::test]
async fn ingest_inserts_only_new_recent_reels() {
    let store_server = MockServer::start().await;
    let provider_server = MockServer::start().await;

    // Seeded store already knows ABC123.
    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recR1", "fields": {"Reel ID": "ABC123"}}
            ]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recAcc1", "fields": {"Username": "creator", "Followers": 1000}}
            ]
        })))
        .mount(&store_server)
        .await;

    let now = chrono::Utc::now().timestamp();
    let forty_days_ago = now - 40 * 86_400;
    Mock::given(method("GET"))
        .and(path("/v1/user_reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "items": [
                    reel_item("ABC123", now - 3600, 4500),
                    reel_item("DEF456", now - 7200, 2000),
                    reel_item("OLD999", forty_days_ago, 9000)
                ],
                "paging_info": {"more_available": false}
            }
        })))
        .mount(&provider_server)
        .await;

    // Exactly one create: the duplicate and the stale item are filtered out.
    Mock::given(method("POST"))
        .and(path("/appBASE/Agency%20Reels"))
        .and(body_partial_json(json!({
            "records": [{"fields": {"Reel ID": "DEF456", "Account": ["recAcc1"]}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recR2", "fields": {}}]
        })))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    let provider = provider_client(&provider_server.uri());

    let stats = ingest::run_ingest(&store, &provider, AGENCY, 30)
        .await
        .expect("ingestion should succeed");

    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.skipped_duplicate, 1);
    assert_eq!(stats.skipped_old, 1);
    assert_eq!(stats.failed_accounts, 0);
}

#[tokio::test]
async fn ingest_survives_one_failing_account() {
    let store_server = MockServer::start().await;
    let provider_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&store_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recAcc1", "fields": {"Username": "broken", "Followers": 10}},
                {"id": "recAcc2", "fields": {"Username": "working", "Followers": 20}}
            ]
        })))
        .mount(&store_server)
        .await;

    // The provider rejects the first account's listing outright but serves
    // the second.
    Mock::given(method("GET"))
        .and(path("/v1/user_reels"))
        .and(wiremock::matchers::query_param("username_or_id", "broken"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&provider_server)
        .await;

    let now = chrono::Utc::now().timestamp();
    Mock::given(method("GET"))
        .and(path("/v1/user_reels"))
        .and(wiremock::matchers::query_param("username_or_id", "working"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "items": [reel_item("NEW111", now - 60, 100)],
                "paging_info": {"more_available": false}
            }
        })))
        .mount(&provider_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recNew", "fields": {}}]
        })))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    let provider = provider_client(&provider_server.uri());

    let stats = ingest::run_ingest(&store, &provider, AGENCY, 30)
        .await
        .expect("stage should survive a failing account");

    assert_eq!(stats.failed_accounts, 1);
    assert_eq!(stats.inserted, 1);
}

#[tokio::test]
async fn metrics_aggregate_is_deterministic() {
    let store_server = MockServer::start().await;
    let today = chrono::Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recAcc1", "fields": {"Username": "creator"}}]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recR1", "fields": {"Reel ID": "A", "Account": ["recAcc1"], "Views": 100, "Date of posting": today}},
                {"id": "recR2", "fields": {"Reel ID": "B", "Account": ["recAcc1"], "Views": 200, "Date of posting": today}},
                {"id": "recR3", "fields": {"Reel ID": "C", "Account": ["recAcc1"], "Views": 300, "Date of posting": today}}
            ]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Accounts"))
        .and(body_partial_json(json!({
            "records": [{
                "id": "recAcc1",
                "fields": {
                    "Total Views": 600,
                    "Posts (1D)": 3,
                    "Posts (3D)": 3,
                    "Posts (7D)": 3,
                    "Avg view / video (L30D)": 200.0
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&store_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    let stats = metrics::run_metrics(&store, AGENCY)
        .await
        .expect("aggregation should succeed");

    assert_eq!(stats.accounts_patched, 1);
    assert_eq!(stats.reels_scored, 3);

    // Virality scores land through the canonical field name: (views-avg)/avg.
    let requests = store_server.received_requests().await.expect("recording on");
    let reel_patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH" && r.url.path().ends_with("Agency%20Reels"))
        .expect("reel patch request");
    let body: Value = serde_json::from_slice(&reel_patch.body).expect("json body");
    let records = body["records"].as_array().expect("records array");
    let score_of = |id: &str| -> f64 {
        records
            .iter()
            .find(|r| r["id"] == id)
            .and_then(|r| r["fields"]["Virality score"].as_f64())
            .expect("score present")
    };
    assert!((score_of("recR1") + 0.5).abs() < f64::EPSILON);
    assert!((score_of("recR2") - 0.0).abs() < f64::EPSILON);
    assert!((score_of("recR3") - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn metrics_write_through_drifted_field_name() {
    let store_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recAcc1", "fields": {"Username": "creator"}}]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recR1", "fields": {
                    "Reel ID": "A",
                    "Account": ["recAcc1"],
                    "Views": 100,
                    "Virality score (%)": 0.0,
                    "Virality notified": false
                }}
            ]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&store_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Reels"))
        .and(body_partial_json(json!({
            "records": [{"id": "recR1", "fields": {"Virality score (%)": 0.0}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    metrics::run_metrics(&store, AGENCY)
        .await
        .expect("aggregation should use the drifted name");
}

#[tokio::test]
async fn metrics_zeroes_account_with_no_reels() {
    let store_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recAcc1", "fields": {"Username": "quiet"}}]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&store_server)
        .await;

    // Stale aggregates get reset even when the account has no reels left.
    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Accounts"))
        .and(body_partial_json(json!({
            "records": [{
                "id": "recAcc1",
                "fields": {
                    "Total Views": 0,
                    "Posts (1D)": 0,
                    "Posts (3D)": 0,
                    "Posts (7D)": 0,
                    "Avg view / video (L30D)": 0.0
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    let stats = metrics::run_metrics(&store, AGENCY)
        .await
        .expect("aggregation should succeed");

    assert_eq!(stats.accounts_patched, 1);
    assert_eq!(stats.reels_scored, 0);
}

#[tokio::test]
async fn metrics_abort_scoring_on_unknown_field_name() {
    let store_server = MockServer::start().await;
    let today = chrono::Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recAcc1", "fields": {"Username": "creator"}}]
        })))
        .mount(&store_server)
        .await;

    // Twelve reels: two scoring batches at the store's limit of ten.
    let records: Vec<_> = (0..12)
        .map(|i| {
            json!({"id": format!("recR{i}"), "fields": {
                "Reel ID": format!("R{i}"),
                "Account": ["recAcc1"],
                "Views": 100,
                "Date of posting": today
            }})
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": records})))
        .mount(&store_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&store_server)
        .await;

    // The base no longer has the score field: the first batch is rejected
    // and no second batch may follow.
    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {
                "type": "UNKNOWN_FIELD_NAME",
                "message": "Unknown field name: \"Virality score\""
            }
        })))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    let result = metrics::run_metrics(&store, AGENCY).await;

    assert!(
        matches!(
            result,
            Err(PipelineError::Airtable(
                AirtableError::UnknownFieldName { .. }
            ))
        ),
        "expected UnknownFieldName to abort the scoring pass, got: {result:?}"
    );
}

#[tokio::test]
async fn notify_flags_viral_reel_and_skips_flagged() {
    let store_server = MockServer::start().await;
    let chat_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "recAcc1", "fields": {"Username": "creator"}}]
        })))
        .mount(&store_server)
        .await;

    // One reel already notified, one viral and unflagged with no usable
    // download link (degraded text delivery), one below threshold.
    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recR1", "fields": {"Reel ID": "A", "Account": ["recAcc1"],
                 "Virality score": 0.9, "Virality notified": true}},
                {"id": "recR2", "fields": {"Reel ID": "B", "Account": ["recAcc1"],
                 "Virality score": 0.6, "Virality notified": false}},
                {"id": "recR3", "fields": {"Reel ID": "C", "Account": ["recAcc1"],
                 "Virality score": 0.1, "Virality notified": false}}
            ]
        })))
        .mount(&store_server)
        .await;

    // One probe plus one degraded notification.
    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&chat_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBASE/Agency%20Reels"))
        .and(body_partial_json(json!({
            "records": [{"id": "recR2", "fields": {"Virality notified": true}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&store_server)
        .await;

    let store = store_client(&store_server.uri());
    let telegram = telegram_client(&chat_server.uri());

    let stats = notify::run_notify(&store, &telegram, AGENCY, "-1001234", 50.0)
        .await
        .expect("notify should succeed");

    assert_eq!(stats.sent_text, 1);
    assert_eq!(stats.sent_video, 0);
    assert_eq!(stats.delivery_failures, 0);
    assert_eq!(stats.flag_failures, 0);
}

#[tokio::test]
async fn notify_run_with_everything_flagged_sends_only_probe() {
    let store_server = MockServer::start().await;
    let chat_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .mount(&store_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBASE/Agency%20Reels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recR1", "fields": {"Reel ID": "A",
                 "Virality score": 0.9, "Virality notified": true}}
            ]
        })))
        .mount(&store_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&chat_server)
        .await;

    let store = store_client(&store_server.uri());
    let telegram = telegram_client(&chat_server.uri());

    let stats = notify::run_notify(&store, &telegram, AGENCY, "-1001234", 50.0)
        .await
        .expect("notify should succeed");

    assert_eq!(stats.sent_text, 0);
    assert_eq!(stats.sent_video, 0);
}
