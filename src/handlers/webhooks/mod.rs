pub mod stripe;

pub use stripe::*;

use axum::{Router, extract::DefaultBodyLimit, routing::post};

use crate::db::AppState;

/// Largest webhook body accepted. Stripe events with expanded objects can
/// exceed the JSON route limit, and a rejected delivery is retried forever.
pub const WEBHOOK_MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(handle_stripe_webhook))
        .layer(DefaultBodyLimit::max(WEBHOOK_MAX_BODY_BYTES))
}
