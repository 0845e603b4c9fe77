//! Test utilities for end-to-end relay tests

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use callguard_core::LockStore;
use callguard_dispatch::CallPlacer;
use callguard_relay::{auth::API_KEY_HEADER, AppState};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Shared secret used by every test relay
pub const TEST_API_KEY: &str = "integration-secret";

/// Caller ID used by every test relay
pub const TEST_FROM_NUMBER: &str = "+15550009999";

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Route relay logs to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("callguard=debug,info")
        .try_init();
}

/// HS256 bearer token signed with `secret`
pub fn bearer_token(secret: &str, claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A relay listening on an ephemeral port
pub struct RunningRelay {
    pub base_url: String,
    pub locks: Arc<LockStore>,
    client: reqwest::Client,
}

impl RunningRelay {
    /// Start a relay around `locks` and `placer`.
    pub async fn start(locks: Arc<LockStore>, placer: Arc<dyn CallPlacer>) -> Self {
        init_test_logging();
        let state = Arc::new(AppState::from_parts(
            TEST_FROM_NUMBER.to_string(),
            TEST_API_KEY.to_string(),
            locks.clone(),
            placer,
        ));
        let addr = serve(callguard_relay::router(state)).await;
        tracing::info!(%addr, "Test relay started");

        Self {
            base_url: format!("http://{addr}"),
            locks,
            client: reqwest::Client::new(),
        }
    }

    /// POST a relay request with the API key header.
    pub async fn relay(&self, phones: &[&str], message: &str) -> (u16, Value) {
        let response = self
            .client
            .post(&self.base_url)
            .header(API_KEY_HEADER, TEST_API_KEY)
            .json(&json!({ "phone": phones, "message": message }))
            .send()
            .await
            .unwrap();
        decode(response).await
    }

    /// POST an arbitrary body with arbitrary headers.
    pub async fn relay_raw(&self, headers: &[(&str, String)], body: Value) -> (u16, Value) {
        let mut request = self.client.post(&self.base_url).json(&body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        decode(request.send().await.unwrap()).await
    }

    pub async fn health(&self) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .unwrap();
        decode(response).await
    }
}

async fn decode(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[derive(Default)]
struct StubState {
    received: Mutex<Vec<HashMap<String, String>>>,
    failing: Mutex<HashSet<String>>,
    next_sid: AtomicU64,
}

/// Minimal stand-in for the Twilio Calls endpoint
pub struct StubProvider {
    pub base_url: String,
    state: Arc<StubState>,
}

impl StubProvider {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/2010-04-01/Accounts/:account/Calls.json", post(create_call))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Answer calls to `to` with a 400.
    pub fn reject(&self, to: &str) {
        self.state.failing.lock().unwrap().insert(to.to_string());
    }

    /// Form bodies received so far
    pub fn received(&self) -> Vec<HashMap<String, String>> {
        self.state.received.lock().unwrap().clone()
    }
}

async fn create_call(
    State(state): State<Arc<StubState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let to = form.get("To").cloned().unwrap_or_default();
    state.received.lock().unwrap().push(form);

    if state.failing.lock().unwrap().contains(&to) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": 21211, "message": format!("The 'To' number {to} is not a valid phone number."), "status": 400})),
        )
            .into_response();
    }

    let n = state.next_sid.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::CREATED,
        Json(json!({"sid": format!("CA{n:032x}"), "status": "queued", "to": to})),
    )
        .into_response()
}
