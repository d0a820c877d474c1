mod support;

use futures::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;

async fn post(client: &reqwest::Client, url: String, body: Value) -> reqwest::Response {
    client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("request should succeed")
}

async fn state(client: &reqwest::Client, base_url: &str) -> Value {
    client
        .get(format!("{base_url}/state"))
        .send()
        .await
        .expect("request should succeed")
        .json()
        .await
        .expect("state should be json")
}

async fn wait_until_idle(client: &reqwest::Client, base_url: &str) -> Value {
    for _ in 0..150 {
        let snapshot = state(client, base_url).await;
        if snapshot["status"]["phase"] == "idle" {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run did not finish in time");
}

#[tokio::test]
async fn test_run_to_completion() {
    let base_url = support::ensure_server();
    let _guard = support::exclusive().await;
    let client = reqwest::Client::new();
    let title = format!("app-{}", uuid::Uuid::new_v4());

    let res = post(
        &client,
        format!("{base_url}/run"),
        json!({
            "domain": "screen",
            "program": [
                {"type": "SET_TITLE", "params": {"text": title}},
                {"type": "ADD_BUTTON", "params": {"label": "Go"}},
            ]
        }),
    )
    .await;
    assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["started"], true);
    assert_eq!(body["commands"], 2);

    let snapshot = wait_until_idle(&client, base_url).await;
    assert_eq!(snapshot["screen"]["live"], false);
    assert_eq!(snapshot["screen"]["state"]["title"], title.as_str());
    assert_eq!(snapshot["screen"]["state"]["widgets"][0]["id"], "button-1");
}

#[tokio::test]
async fn test_malformed_program_is_rejected() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = post(
        &client,
        format!("{base_url}/run"),
        json!({"domain": "entity", "program": {"type": "MOVE_X"}}),
    )
    .await;

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.expect("json body");
    assert!(body["error"].as_str().is_some_and(|e| e.contains("array")));
}

#[tokio::test]
async fn test_second_run_conflicts_until_stopped() {
    let base_url = support::ensure_server();
    let _guard = support::exclusive().await;
    let client = reqwest::Client::new();
    let forever = json!({
        "domain": "screen",
        "program": [{"type": "FOREVER"}, {"type": "END_REPEAT"}]
    });

    let res = post(&client, format!("{base_url}/run"), forever.clone()).await;
    assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);

    let res = post(&client, format!("{base_url}/run"), forever).await;
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

    let res = post(&client, format!("{base_url}/stop"), json!({})).await;
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["applied"], true);

    wait_until_idle(&client, base_url).await;
}

#[tokio::test]
async fn test_breakpoint_toggle_by_id() {
    let base_url = support::ensure_server();
    let _guard = support::exclusive().await;
    let client = reqwest::Client::new();

    let res = post(
        &client,
        format!("{base_url}/run"),
        json!({"domain": "device", "program": [{"type": "LED_ON", "id": 41}]}),
    )
    .await;
    assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
    wait_until_idle(&client, base_url).await;

    let res = post(&client, format!("{base_url}/breakpoints/41"), json!({})).await;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["id"], 41);
    assert_eq!(body["has_breakpoint"], true);

    let res = post(&client, format!("{base_url}/breakpoints/999999"), json!({})).await;
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_speed_is_clamped() {
    let base_url = support::ensure_server();
    let _guard = support::exclusive().await;
    let client = reqwest::Client::new();

    let res = post(&client, format!("{base_url}/speed"), json!({"multiplier": 50})).await;
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["speed"], 10.0);

    let res = post(&client, format!("{base_url}/speed"), json!({"multiplier": 1})).await;
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["speed"], 1.0);
}

#[tokio::test]
async fn test_idle_input_is_visible_in_state() {
    let base_url = support::ensure_server();
    let _guard = support::exclusive().await;
    let client = reqwest::Client::new();

    let res = post(
        &client,
        format!("{base_url}/input"),
        json!({"kind": "sensor", "pin": 3, "value": 700}),
    )
    .await;
    assert_eq!(res.status(), reqwest::StatusCode::NO_CONTENT);

    let snapshot = state(&client, base_url).await;
    assert_eq!(snapshot["device"]["state"]["inputs"]["sensors"]["3"], 700.0);
}

#[tokio::test]
async fn test_ws_sends_frame_then_status() {
    let base_url = support::ensure_server();
    let ws_url = format!("{}/ws", base_url.replacen("http://", "ws://", 1));

    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect("websocket should connect");

    let mut kinds = Vec::new();
    while kinds.len() < 2 {
        let msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("message in time")
            .expect("stream open")
            .expect("valid message");
        let text = msg.to_text().expect("text message");
        let value: Value = serde_json::from_str(text).expect("json message");
        kinds.push(value["type"].as_str().unwrap_or_default().to_string());
    }

    assert_eq!(kinds, vec!["Frame", "Status"]);
}
