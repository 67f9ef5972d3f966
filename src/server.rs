//! HTTP router assembly
//!
//! Wires handlers to paths and stacks the shared layers. Used by `main` and
//! by the integration tests, which drive the returned `Router` directly.

use crate::handlers::{self, AppState};
use crate::middleware::{request_id_middleware, require_token};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router
///
/// `/ask` and `/ollama/chat` sit behind the token middleware, which passes
/// everything through when authentication is disabled.
pub fn build_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/ask", post(handlers::ask::handler))
        .route("/ollama/chat", post(handlers::ask::handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(handlers::health::handler))
        .route("/models", get(handlers::models::handler))
        .route("/metrics", get(handlers::metrics::handler))
        .merge(chat_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
