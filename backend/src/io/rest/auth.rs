//! Shared-token bearer authentication.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::api_error::unauthorized_response;
use crate::AppState;

/// Token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(request: &Request) -> Option<&str> {
    let header = request.headers().get("authorization")?;
    let value = header.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Compare without an early exit so timing does not leak a matching prefix
pub fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Reject requests that do not carry the configured token
pub async fn require_bearer_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = extract_bearer_token(&request).map(str::to_owned);
    match token {
        Some(token) if token_matches(&token, &state.access_token) => next.run(request).await,
        Some(_) => {
            warn!("Invalid access token for {} {}", request.method(), request.uri().path());
            unauthorized_response()
        }
        None => {
            warn!("Missing access token for {} {}", request.method(), request.uri().path());
            unauthorized_response()
        }
    }
}
