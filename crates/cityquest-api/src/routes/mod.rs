//! Route modules and the assembled application router.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod health;
pub mod likes;
pub mod progress;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with the web client's origins once they are configurable.
    Router::new()
        .merge(health::router())
        .nest("/api/v1/progress", progress::router())
        .nest("/api/v1/quests", likes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
