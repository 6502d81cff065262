use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::info;

use super::api_error::{rejection_response, session_error_response};
use crate::AppState;
use shared::{OnlineUsersResponse, PresenceRequest, SuccessResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/presence", post(record_presence))
        .route("/online-users", get(list_online_users))
}

/// Heartbeat from a signed-in child
pub async fn record_presence(
    State(state): State<AppState>,
    payload: Result<Json<PresenceRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /presence - user: {}", request.user_id);

    match state.presence_service.record_presence(request).await {
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => session_error_response("record presence", e),
    }
}

pub async fn list_online_users(State(state): State<AppState>) -> Response {
    info!("GET /online-users");

    match state.presence_service.list_online_users().await {
        Ok(users) => (StatusCode::OK, Json(OnlineUsersResponse { users })).into_response(),
        Err(e) => session_error_response("list online users", e),
    }
}
