use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::AppState;

/// Create the health router
pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

/// Basic up/down status
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Liveness probe: the process is running
async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// Readiness probe: the database answers a ping
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match crate::db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "up",
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "database": "down",
                "error": e.response_message(),
            })),
        ),
    }
}
