//! Test utilities and fixtures for paydesk integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::{Value, json};
use tower::ServiceExt;

pub use paydesk::db::{AppState, DbPool, init_db, queries};
pub use paydesk::models::*;
pub use paydesk::payments::{StripeClient, StripeConfig};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const TEST_SECRET_KEY: &str = "sk_test_xxx";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Single-connection in-memory pool: every checkout sees the same database.
pub fn create_test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    pool
}

pub fn create_test_stripe_client(api_base: &str) -> StripeClient {
    StripeClient::new(&StripeConfig {
        secret_key: TEST_SECRET_KEY.to_string(),
        api_base: api_base.to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to create Stripe client")
}

/// AppState whose Stripe client points at `api_base`
pub fn create_test_app_state_with_stripe(api_base: &str) -> AppState {
    AppState {
        db: create_test_pool(),
        stripe: create_test_stripe_client(api_base),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        webhook_tolerance_secs: 300,
    }
}

/// AppState whose Stripe client points at a closed port
pub fn create_test_app_state() -> AppState {
    create_test_app_state_with_stripe("http://127.0.0.1:9")
}

pub fn test_app(state: AppState) -> Router {
    paydesk::handlers::app(state)
}

/// Get current Unix timestamp as a string (for webhook signature tests)
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Get an old timestamp (10 minutes ago, beyond the 5-minute tolerance)
pub fn old_timestamp() -> String {
    (chrono::Utc::now().timestamp() - 600).to_string()
}

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Full `stripe-signature` header value for `payload`, signed now
pub fn signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = current_timestamp();
    let signature = compute_stripe_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, signature)
}

pub fn payment_intent_event(event_type: &str, intent_id: &str, amount: i64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", intent_id),
        "object": "event",
        "type": event_type,
        "data": {
            "object": {
                "id": intent_id,
                "object": "payment_intent",
                "amount": amount,
                "currency": "usd",
                "status": "succeeded"
            }
        }
    }))
    .unwrap()
}

pub async fn post_webhook(app: Router, payload: Vec<u8>, signature: Option<&str>) -> Response {
    let mut request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        request = request.header("stripe-signature", sig);
    }

    app.oneshot(request.body(Body::from(payload)).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    post_raw(app, uri, &body.to_string()).await
}

/// POST an arbitrary string labelled as JSON
pub async fn post_raw(app: Router, uri: &str, body: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).expect("response body should be JSON")
}

// ============ Fake Stripe API ============

/// A local stand-in for the Stripe API.
#[derive(Clone)]
pub struct FakeStripe {
    pub api_base: String,
    pub calls: Arc<AtomicUsize>,
    /// Decoded form fields of the most recent request
    pub last_form: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl FakeStripe {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_field(&self, name: &str) -> Option<String> {
        self.last_form
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

/// Start a fake Stripe API on a random local port.
///
/// With `fail = true` every request is answered with a card error.
pub async fn spawn_fake_stripe(fail: bool) -> FakeStripe {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let fake = FakeStripe {
        api_base: format!("http://{}", addr),
        calls: Arc::new(AtomicUsize::new(0)),
        last_form: Arc::new(Mutex::new(Vec::new())),
        fail,
    };

    let app = Router::new()
        .route("/v1/payment_intents", post(fake_create_payment_intent))
        .with_state(fake.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    fake
}

async fn fake_create_payment_intent(
    State(fake): State<FakeStripe>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let n = fake.calls.fetch_add(1, Ordering::SeqCst) + 1;

    let form: Vec<(String, String)> = body
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.replace("%5B", "[").replace("%5D", "]"), v.to_string()))
        .collect();
    *fake.last_form.lock().unwrap() = form;

    if !headers.contains_key("authorization") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "You did not provide an API key." } })),
        )
            .into_response();
    }

    if fake.fail {
        return (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({
                "error": { "code": "card_declined", "message": "Your card was declined." }
            })),
        )
            .into_response();
    }

    let id = format!("pi_test_{}", n);
    Json(json!({
        "id": id,
        "object": "payment_intent",
        "client_secret": format!("{}_secret_abc", id),
        "amount": fake.last_field("amount").and_then(|a| a.parse::<i64>().ok()),
        "currency": fake.last_field("currency"),
    }))
    .into_response()
}
