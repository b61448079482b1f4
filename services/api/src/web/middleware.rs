//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use linkstash_core::ports::AuthError;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that validates the bearer token and extracts the caller's
/// identity.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to
/// use. If missing, invalid, or expired, returns 401 Unauthorized. No handler
/// behind this middleware ever runs without a resolved identity.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Missing)?;

    // 2. It must be a bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Missing)?;

    // 3. Verify signature and expiry, resolving the identity
    let identity = state.tokens.verify(token)?;

    // 4. Insert the identity into request extensions
    req.extensions_mut().insert(identity);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
