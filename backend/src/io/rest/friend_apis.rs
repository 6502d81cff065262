use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::info;

use super::api_error::{rejection_response, session_error_response};
use crate::AppState;
use shared::{AddFriendRequest, FriendListResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/friends/add", post(add_friend))
        .route("/friends/:user_id", get(list_friends))
}

pub async fn add_friend(
    State(state): State<AppState>,
    payload: Result<Json<AddFriendRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /friends/add - request: {:?}", request);

    match state.friend_service.add_friend(request).await {
        Ok(friends) => (StatusCode::OK, Json(FriendListResponse { friends })).into_response(),
        Err(e) => session_error_response("add friend", e),
    }
}

pub async fn list_friends(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    info!("GET /friends/{}", user_id);

    match state.friend_service.list_friends(&user_id).await {
        Ok(friends) => (StatusCode::OK, Json(FriendListResponse { friends })).into_response(),
        Err(e) => session_error_response("list friends", e),
    }
}
