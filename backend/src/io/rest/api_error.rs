use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

use crate::domain::SessionError;
use shared::ErrorResponse;

fn error_body(status: StatusCode, message: impl Into<String>, code: &str) -> Response {
    let body = ErrorResponse {
        error: message.into(),
        code: code.to_string(),
    };
    (status, Json(body)).into_response()
}

pub fn status_for(error: &SessionError) -> StatusCode {
    match error {
        SessionError::NotFound { .. } => StatusCode::NOT_FOUND,
        SessionError::BattleFull
        | SessionError::AlreadyStarted
        | SessionError::SessionFull
        | SessionError::InvalidTransition(_)
        | SessionError::AnswerOutOfOrder { .. }
        | SessionError::Validation(_) => StatusCode::BAD_REQUEST,
        SessionError::ConcurrentUpdate(_) => StatusCode::CONFLICT,
        SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain failure to its HTTP response. Storage details never leave the server.
pub fn session_error_response(operation: &str, error: SessionError) -> Response {
    let status = status_for(&error);
    match &error {
        SessionError::Storage(cause) => {
            error!("Failed to {}: {:#}", operation, cause);
            error_body(status, "Internal server error", error.code())
        }
        _ => {
            warn!("Failed to {}: {}", operation, error);
            error_body(status, error.to_string(), error.code())
        }
    }
}

/// Malformed or mistyped JSON body
pub fn rejection_response(rejection: JsonRejection) -> Response {
    warn!("Rejected request body: {}", rejection.body_text());
    error_body(StatusCode::BAD_REQUEST, rejection.body_text(), "INVALID_REQUEST")
}

pub fn unauthorized_response() -> Response {
    error_body(StatusCode::UNAUTHORIZED, "Unauthorized", "UNAUTHORIZED")
}
