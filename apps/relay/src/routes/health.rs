//! Health check HTTP route handlers
//!
//! Provides endpoints for checking the health of the relay:
//! - `GET /health` - Simple liveness check (returns 200 OK)
//! - `GET /health/live` - Liveness probe with version and connection counts

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::state::RelayState;

/// Create health check router
pub fn health_router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(simple_health))
        .route("/live", get(liveness_probe))
        .with_state(state)
}

/// Simple health check - always returns OK if the server is running
async fn simple_health() -> &'static str {
    "OK"
}

/// Liveness probe with version and connection counts
async fn liveness_probe(State(state): State<RelayState>) -> impl IntoResponse {
    let stats = state.connection_stats();
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": stats.connections,
        "players": stats.players,
        "remotes": stats.remotes,
    }))
}
