//! Shared utilities for integration tests.
//!
//! `start_mock_gateway` runs an in-process stand-in for the MVola API on an
//! ephemeral port. It answers from a scripted `MockBehavior` and, when asked
//! to, calls the bridge back on the `X-Callback-URL` it was given.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use mvola_bridge::config::{BridgeConfig, FallbackStrategy};
use mvola_bridge::{HttpServer, Shutdown};

pub const MOCK_TOKEN: &str = "mock-access-token-0123456789";
const MERCHANT_PAY: &str = "/mvola/mm/transactions/type/merchantpay/1.0.0";

/// Scripted gateway answers.
#[derive(Clone)]
pub struct MockBehavior {
    /// Answer the token endpoint with this instead of a token.
    pub token: Option<(u16, Value)>,
    pub create: (u16, Value),
    pub status: (u16, Value),
    pub details: (u16, Value),
    /// Send a callback with this `transactionStatus` after the delay.
    pub callback: Option<(Duration, String)>,
}

impl MockBehavior {
    /// Accept with `handle`, never call back, answer polls with "not found".
    pub fn accepting(handle: &str) -> Self {
        Self {
            token: None,
            create: (
                202,
                json!({
                    "status": "pending",
                    "serverCorrelationId": handle,
                    "notificationMethod": "callback"
                }),
            ),
            status: (404, json!({"errorDescription": "not found"})),
            details: (404, json!({"errorDescription": "not found"})),
            callback: None,
        }
    }

    pub fn with_callback(mut self, delay: Duration, status: &str) -> Self {
        self.callback = Some((delay, status.to_string()));
        self
    }

    pub fn with_status(mut self, status: u16, body: Value) -> Self {
        self.status = (status, body);
        self
    }

    pub fn with_details(mut self, status: u16, body: Value) -> Self {
        self.details = (status, body);
        self
    }

    pub fn with_token_rejection(mut self, status: u16, body: Value) -> Self {
        self.token = Some((status, body));
        self
    }

    pub fn rejecting(status: u16, body: Value) -> Self {
        Self {
            create: (status, body),
            ..Self::accepting("unused")
        }
    }
}

/// One request the mock gateway received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub correlation_id: Option<String>,
    pub callback_url: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    http: reqwest::Client,
}

/// Handle to a running mock gateway.
pub struct MockGateway {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockGateway {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, fragment: &str) -> usize {
        self.calls().iter().filter(|c| c.path.contains(fragment)).count()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn scripted((status, body): &(u16, Value)) -> Response {
    let status = StatusCode::from_u16(*status).unwrap();
    (status, Json(body.clone())).into_response()
}

impl MockState {
    fn record(&self, path: String, headers: &HeaderMap, body: Value) {
        self.calls.lock().unwrap().push(RecordedCall {
            path,
            correlation_id: header(headers, "X-CorrelationID"),
            callback_url: header(headers, "X-Callback-URL"),
            body,
        });
    }
}

async fn token(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.record("/token".to_string(), &headers, Value::Null);
    if let Some(rejection) = &state.behavior.token {
        return scripted(rejection);
    }
    match header(&headers, "authorization") {
        Some(auth) if auth.starts_with("Basic ") => Json(json!({
            "access_token": MOCK_TOKEN,
            "scope": "EXT_INT_MVOLA_SCOPE",
            "token_type": "Bearer",
            "expires_in": 3600
        }))
        .into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"}))).into_response(),
    }
}

async fn create(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(format!("{}/", MERCHANT_PAY), &headers, body.clone());

    let accepted = (200..300).contains(&state.behavior.create.0);
    if let (true, Some((delay, status))) = (accepted, state.behavior.callback.clone()) {
        let url = header(&headers, "X-Callback-URL").unwrap();
        let correlation_id = header(&headers, "X-CorrelationID").unwrap();
        let handle = state.behavior.create.1["serverCorrelationId"].clone();
        let http = state.http.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let payload = json!({
                "transactionStatus": status,
                "serverCorrelationId": handle,
                "transactionReference": "TR-CALLBACK",
                "amount": body["amount"],
                "currency": "Ar",
                "debitParty": body["debitParty"],
                "creditParty": body["creditParty"],
                "metadata": [
                    {"key": "partnerName", "value": "APP_Shop"},
                    {"key": "XCorrelationId", "value": correlation_id}
                ]
            });
            let _ = http.put(url).json(&payload).send().await;
        });
    }

    scripted(&state.behavior.create)
}

async fn status(
    State(state): State<MockState>,
    Path(handle): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("{}/status/{}", MERCHANT_PAY, handle), &headers, Value::Null);
    scripted(&state.behavior.status)
}

async fn details(
    State(state): State<MockState>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("{}/{}", MERCHANT_PAY, reference), &headers, Value::Null);
    scripted(&state.behavior.details)
}

/// Start a mock MVola gateway on an ephemeral port.
pub async fn start_mock_gateway(behavior: MockBehavior) -> MockGateway {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        behavior,
        calls: calls.clone(),
        http: reqwest::Client::new(),
    };

    let app = Router::new()
        .route("/token", post(token))
        .route(&format!("{}/", MERCHANT_PAY), post(create))
        .route(&format!("{}/status/{{handle}}", MERCHANT_PAY), get(status))
        .route(&format!("{}/{{reference}}", MERCHANT_PAY), get(details))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockGateway { addr, calls }
}

/// Bridge configuration pointed at `gateway_url` with a short callback wait.
pub fn test_config(
    gateway_url: &str,
    callback_wait_secs: u64,
    fallback: FallbackStrategy,
) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.gateway.base_url = gateway_url.to_string();
    config.gateway.token_timeout_secs = 2;
    config.gateway.create_timeout_secs = 2;
    config.gateway.status_timeout_secs = 2;
    config.gateway.details_timeout_secs = 2;
    config.transactions.callback_wait_secs = callback_wait_secs;
    config.transactions.fallback = fallback;
    config.audit.enabled = false;
    config.timeouts.request_secs = callback_wait_secs + 10;
    config
}

/// A bridge running on an ephemeral port.
pub struct Bridge {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub server: tokio::task::JoinHandle<()>,
}

impl Bridge {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_bridge(config: BridgeConfig) -> Bridge {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    Bridge { addr, shutdown, server }
}

/// A valid create-transaction body.
pub fn payment_body(reference: &str) -> Value {
    json!({
        "amount": 1000,
        "clientMsisdn": "0343500003",
        "partnerMsisdn": "0343500004",
        "descriptionTransaction": "Order 42",
        "referenceID": reference,
        "name": "Shop"
    })
}

/// A callback as MVola sends it.
pub fn callback_body(correlation_id: &str, status: &str) -> Value {
    json!({
        "transactionStatus": status,
        "serverCorrelationId": "SCID-EXT",
        "transactionReference": "TR-EXT",
        "metadata": [
            {"key": "partnerName", "value": "APP_Shop"},
            {"key": "XCorrelationId", "value": correlation_id}
        ]
    })
}
