// HTTP surface of the link flow: the OAuth redirect target and a health probe

mod callback;

pub use callback::OAuthCallback;

use crate::oauth::LinkCoordinator;
use axum::{extract::Request, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Fixed redirect path registered with the GitHub OAuth app
pub const CALLBACK_PATH: &str = "/callback";

/// Create the callback server router
pub fn create_router(coordinator: Arc<LinkCoordinator>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback::oauth_callback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(coordinator)
}

/// Records the path only; the callback query carries the state and code.
fn request_span(request: &Request) -> tracing::Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
