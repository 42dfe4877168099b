use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::state::AppState;

/// Rejects requests that do not carry one of the configured bearer keys.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_authorized(&state.config.api_keys, request.headers()) {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

fn is_authorized(api_keys: &[String], headers: &HeaderMap) -> bool {
    bearer_token(headers).is_some_and(|token| api_keys.iter().any(|key| key == token))
}

pub(super) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
