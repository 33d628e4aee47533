//! Authentication handler
//!
//! One action-dispatching endpoint (`login` / `register`), keeping the
//! original wire contract while the credential handling underneath uses
//! Argon2id hashes and signed tokens.

use crate::auth::AuthService;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use velund_core::User;

/// Requested auth action
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    #[default]
    Login,
    Register,
}

/// Auth request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthRequest {
    /// `login` (default) or `register`
    #[serde(default)]
    pub action: AuthAction,

    pub email: String,
    pub password: String,

    /// Registration only
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Auth response body
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub user: User,
    /// Signed access token tied to the user id
    pub token: String,
}

/// Handle login and registration
#[utoipa::path(
    post,
    path = "/api/v1/auth",
    tag = "auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Missing fields or email already exists"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn auth_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let service = AuthService::new(state.store.clone(), state.jwt.clone());

    match req.action {
        AuthAction::Register => {
            let outcome = service
                .register(
                    &req.email,
                    &req.password,
                    req.full_name.as_deref().unwrap_or_default(),
                    req.company_name,
                    req.city,
                )
                .await?;

            Ok((
                StatusCode::CREATED,
                Json(AuthResponse {
                    success: true,
                    user: outcome.user,
                    token: outcome.token,
                }),
            ))
        }
        AuthAction::Login => {
            let outcome = service.login(&req.email, &req.password).await?;

            Ok((
                StatusCode::OK,
                Json(AuthResponse {
                    success: true,
                    user: outcome.user,
                    token: outcome.token,
                }),
            ))
        }
    }
}
