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
use shared::{
    CreateStudySessionRequest, JoinStudySessionRequest, StartStudySessionRequest, StudySession,
    StudySessionListResponse, StudySessionResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/study-session", post(create_study_session))
        .route("/study-sessions", get(list_study_sessions))
        .route("/study-session/:id", get(get_study_session))
        .route("/study-session/:id/join", post(join_study_session))
        .route("/study-session/:id/start", post(start_study_session))
        .route("/study-session/:id/complete", post(complete_study_session))
}

fn session_response(session: StudySession) -> Response {
    (StatusCode::OK, Json(StudySessionResponse { session })).into_response()
}

pub async fn create_study_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateStudySessionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /study-session - request: {:?}", request);

    match state.study_session_service.create_study_session(request).await {
        Ok(session) => session_response(session),
        Err(e) => session_error_response("create study session", e),
    }
}

pub async fn list_study_sessions(State(state): State<AppState>) -> Response {
    info!("GET /study-sessions");

    match state.study_session_service.list_study_sessions().await {
        Ok(sessions) => (StatusCode::OK, Json(StudySessionListResponse { sessions })).into_response(),
        Err(e) => session_error_response("list study sessions", e),
    }
}

pub async fn get_study_session(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    info!("GET /study-session/{}", session_id);

    match state.study_session_service.get_study_session(&session_id).await {
        Ok(session) => session_response(session),
        Err(e) => session_error_response("get study session", e),
    }
}

pub async fn join_study_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<JoinStudySessionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /study-session/{}/join - request: {:?}", session_id, request);

    match state.study_session_service.join_study_session(&session_id, request).await {
        Ok(session) => session_response(session),
        Err(e) => session_error_response("join study session", e),
    }
}

pub async fn start_study_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<StartStudySessionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    info!("POST /study-session/{}/start - user: {}", session_id, request.user_id);

    match state.study_session_service.start_study_session(&session_id, &request.user_id).await {
        Ok(session) => session_response(session),
        Err(e) => session_error_response("start study session", e),
    }
}

pub async fn complete_study_session(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    info!("POST /study-session/{}/complete", session_id);

    match state.study_session_service.complete_study_session(&session_id).await {
        Ok(session) => session_response(session),
        Err(e) => session_error_response("complete study session", e),
    }
}
