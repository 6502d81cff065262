use axum::{response::Json, routing::get, Router};

use crate::AppState;
use shared::HealthResponse;

/// Liveness probe, reachable without a token
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
