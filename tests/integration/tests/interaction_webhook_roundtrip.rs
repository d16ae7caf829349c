use std::sync::Arc;

use daysince_integration_tests::TestServer;
use daysince_store::{IncidentStore, InMemoryIncidentStore, SqliteIncidentStore};
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};
use tempfile::tempdir;

fn command_body(name: &str, options: Value) -> String {
    json!({
        "type": 2,
        "id": "A",
        "token": "T",
        "data": { "name": name, "options": options }
    })
    .to_string()
}

#[tokio::test]
async fn integration_reset_then_days_round_trip_through_sqlite_store() {
    let platform = MockServer::start_async().await;
    let confirmation = platform.mock(|when, then| {
        when.method(POST)
            .path("/api/v10/interactions/A/T/callback")
            .json_body(json!({
                "type": 4,
                "data": {"content": "Okay. It's now 0 days since the last incident."}
            }));
        then.status(204);
    });
    let days_reply = platform.mock(|when, then| {
        when.method(POST)
            .path("/api/v10/interactions/A/T/callback")
            .json_body(json!({
                "type": 4,
                "data": {"content": "It has been 0 day(s) since the last incident. The last incident was disk full"}
            }));
        then.status(204);
    });

    let temp = tempdir().expect("tempdir");
    let store = Arc::new(
        SqliteIncidentStore::new(temp.path().join("incidents.sqlite")).expect("open store"),
    );
    let server = TestServer::start(platform.base_url(), store.clone()).await;

    let response = server
        .post_signed(&command_body(
            "reset",
            json!([{"name": "reason", "value": "disk full"}]),
        ))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), "Ok.");
    confirmation.assert();

    let response = server.post_signed(&command_body("days", Value::Null)).await;
    assert_eq!(response.status().as_u16(), 200);
    days_reply.assert();

    let history = store.list_history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].description, "disk full");
    assert_eq!(history[0].time % 86_400, 0);
}

#[tokio::test]
async fn integration_ping_is_answered_inline_without_callback() {
    let platform = MockServer::start_async().await;
    let any_callback = platform.mock(|when, then| {
        when.method(POST);
        then.status(204);
    });
    let server = TestServer::start(
        platform.base_url(),
        Arc::new(InMemoryIncidentStore::new()),
    )
    .await;

    let response = server.post_signed(r#"{"type":1}"#).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"type": 1}));
    any_callback.assert_calls(0);
}

#[tokio::test]
async fn integration_unsigned_request_is_rejected() {
    let platform = MockServer::start_async().await;
    let server = TestServer::start(
        platform.base_url(),
        Arc::new(InMemoryIncidentStore::new()),
    )
    .await;

    let response = reqwest::Client::new()
        .post(server.url())
        .header("x-signature-ed25519", "00".repeat(64))
        .header("x-signature-timestamp", "1718000000")
        .body(command_body("reset", Value::Null))
        .send()
        .await
        .expect("send");
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({"message": "Invalid request signature."}));
}

#[tokio::test]
async fn integration_unreachable_callback_still_acknowledges_command() {
    let store = Arc::new(InMemoryIncidentStore::new());
    let server = TestServer::start("http://127.0.0.1:9".to_string(), store.clone()).await;

    let response = server.post_signed(&command_body("reset", Value::Null)).await;
    assert_eq!(response.status().as_u16(), 200);
    let last = store.get_last().await.expect("get").expect("record");
    assert_eq!(last.last_description, "Unknown");
}
