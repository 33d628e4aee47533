/// Authentication middleware for protecting routes
///
/// Extracts and validates JWT tokens from the Authorization header.
/// On success, adds the verified identity to request extensions; handlers
/// consume only this identity, never a raw client-supplied header.
use super::jwt::validate_access_token;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use velund_core::Role;

/// Verified identity extracted from a validated JWT
///
/// Extracted in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

/// Authentication middleware that requires a valid JWT bearer token
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let claims = validate_access_token(&state.jwt, token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let user_id: i32 = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = AuthenticatedUser {
        user_id,
        email: claims.email,
        role: claims.role.parse().unwrap_or_default(),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
