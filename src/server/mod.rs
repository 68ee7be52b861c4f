/// Inbound HTTP adapter
pub mod handlers;

pub use handlers::{AppState, HealthResponse, RATE_LIMITED_NOTICE};

use axum::{routing::get, Router};
use std::sync::Arc;

/// Build the relay router
///
/// `/` accepts GET and POST; `/health` reports liveness and remaining quota.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::relay).post(handlers::relay))
        .route("/health", get(handlers::health))
        .with_state(state)
}
