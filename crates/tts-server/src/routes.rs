//! Router assembly.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the application router.
pub fn create_router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/voices", get(handlers::voices))
        .route("/synthesize", post(handlers::synthesize))
        .route("/ws", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
