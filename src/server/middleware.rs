use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

use super::AppState;

/// Bearer-token authentication middleware for the API subtree.
///
/// Rejects with a distinguishing reason ("no token provided", "token
/// expired", "invalid token") before any handler runs. The validated
/// claims are inserted into the request extensions so handlers receive
/// the caller identity explicitly instead of reading a shared holder.
pub async fn bearer_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)
        .ok_or_else(|| AppError::Auth("no token provided".to_string()))?;

    let claims = state.jwt_validator.validate(token)?;

    tracing::debug!(subject = %claims.subject(), "Request authenticated");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
