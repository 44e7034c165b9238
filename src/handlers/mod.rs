pub mod public;
pub mod webhooks;

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::AppState;

/// Largest request body accepted on the public JSON routes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full application: public JSON routes plus the raw-body webhook route.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public::router().layer(DefaultBodyLimit::max(MAX_BODY_BYTES)))
        .merge(webhooks::router())
        // The storefront is served from its own origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
