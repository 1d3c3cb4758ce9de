use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Build the router passed to the serving loop. All route bindings
/// live here; there is no implicit global registry.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/ocr", post(handlers::recognize_text))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
