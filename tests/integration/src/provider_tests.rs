//! Full stack: environment config, Twilio client, stub provider.

use std::collections::HashMap;
use std::sync::Arc;

use callguard_relay::{AppState, Config};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::test_utils::{init_test_logging, StubProvider, TEST_API_KEY};

async fn start_relay(provider: &StubProvider, lock_file: &std::path::Path) -> String {
    init_test_logging();
    let vars = HashMap::from([
        ("TWILIO_ACCOUNT_SID", "AC0000".to_string()),
        ("TWILIO_AUTH_TOKEN", "auth".to_string()),
        ("TWILIO_FROM_NUMBER", "+15550001111".to_string()),
        ("TWILIO_API_BASE", provider.base_url.clone()),
        ("API_KEY", TEST_API_KEY.to_string()),
        ("LOCK_FILE", lock_file.display().to_string()),
        ("DISPATCH_TIMEOUT_SECS", "5".to_string()),
    ]);
    let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();
    let state = Arc::new(AppState::new(&config).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, callguard_relay::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(base_url: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(base_url)
        .header("x-api-key", TEST_API_KEY)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_calls_reach_provider_with_twiml() {
    let provider = StubProvider::start().await;
    let dir = tempfile::tempdir().unwrap();
    let relay = start_relay(&provider, &dir.path().join("locks.json")).await;

    let body = post(
        &relay,
        json!({"phone": ["+15552223333"], "message": "Replica lag > 5m"}),
    )
    .await;

    assert_eq!(body["success"], true);
    assert!(body["calls"][0]["callSid"].as_str().unwrap().starts_with("CA"));

    let received = provider.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["From"], "+15550001111");
    assert_eq!(received[0]["To"], "+15552223333");
    assert_eq!(
        received[0]["Twiml"],
        "<Response><Say>Replica lag &gt; 5m</Say></Response>"
    );
}

#[tokio::test]
async fn test_provider_rejection_reported_per_number() {
    let provider = StubProvider::start().await;
    provider.reject("+15550000000");
    let dir = tempfile::tempdir().unwrap();
    let relay = start_relay(&provider, &dir.path().join("locks.json")).await;

    let body = post(
        &relay,
        json!({"phone": ["+15550000000", "+15552223333"], "message": "hi"}),
    )
    .await;

    assert_eq!(body["success"], false);
    let error = body["calls"][0]["error"].as_str().unwrap();
    assert!(error.contains("400"));
    assert!(error.contains("not a valid phone number"));
    assert!(body["calls"][1]["callSid"].is_string());

    // The rejected number was not locked and is retried on the next request.
    let again = post(&relay, json!({"phone": ["+15550000000"], "message": "hi"})).await;
    assert!(again["calls"][0]["error"].is_string());
    assert_eq!(provider.received().len(), 3);
}
