use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::errors::auth_error::AuthError;
use crate::state::AppState;

/// Extract the bearer token from the Authorization header
fn extract_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?;
    let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Constant-time comparison against every configured secret
fn matches_api_secret(token: &str, secrets: &[String]) -> bool {
    secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(false, |found, secret| {
            found | bool::from(token.as_bytes().ct_eq(secret.as_bytes()))
        })
}

/// Bearer-secret authentication for the `/v1` routes
///
/// Passes every request through when `server.auth_required` is off;
/// otherwise the token must equal one of `server.auth_api_secrets`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.config.server.auth_required {
        return Ok(next.run(request).await);
    }

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let token = extract_token(&request).inspect_err(|e| {
        tracing::warn!(method = %method, path = %path, error = %e, "Request without valid credentials");
    })?;

    if matches_api_secret(token, &state.config.server.auth_api_secrets) {
        tracing::debug!(method = %method, path = %path, "API secret authentication successful");
        Ok(next.run(request).await)
    } else {
        tracing::warn!(method = %method, path = %path, "API secret authentication failed: token mismatch");
        Err(AuthError::Unauthorized("Invalid API secret".to_string()))
    }
}
