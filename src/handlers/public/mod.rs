mod payment_intents;
mod transactions;

pub use payment_intents::*;
pub use transactions::*;

use axum::{Json, Router, routing::{get, post}};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/create-payment-intent", post(create_payment_intent))
        // Debugging aid: full ledger, newest first
        .route("/transactions", get(list_transactions))
}
