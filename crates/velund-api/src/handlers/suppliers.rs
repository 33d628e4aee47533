//! Supplier management: own submissions plus the admin moderation queue
//!
//! All verbs sit behind the auth middleware, so handlers see a verified
//! identity. Admin-only paths additionally re-check the role against the
//! database rather than trusting the token claim.

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use velund_core::{NewSubmission, Role, SubmissionStatus};

/// Query parameters for listing suppliers
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// `true` to request the moderation queue (admin only)
    pub admin: Option<String>,

    /// Moderation queue status filter, defaults to `pending`
    pub status: Option<String>,
}

/// Moderation request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerationRequest {
    pub supplier_id: Option<i32>,
    /// `approve` or `reject`
    pub action: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Moderation response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationResponse {
    pub success: bool,
    pub action: String,
}

/// Query parameters for deleting a submission
#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteQuery {
    pub id: Option<i32>,
}

/// Re-check the caller's role against the database
async fn require_admin(state: &AppState, auth: &AuthenticatedUser) -> Result<(), AppError> {
    let role = state.store.user_role(auth.user_id).await?;
    if role != Some(Role::Admin) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}

/// List own submissions, or the moderation queue with `?admin=true`
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    tag = "suppliers",
    params(ListQuery),
    responses(
        (status = 200, description = "Submissions list"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let is_admin_view = params.admin.as_deref() == Some("true");

    if is_admin_view {
        require_admin(&state, &auth).await?;

        let status = match params.status.as_deref() {
            Some(raw) => raw
                .parse::<SubmissionStatus>()
                .map_err(|_| AppError::BadRequest(format!("Invalid status: {raw}")))?,
            None => SubmissionStatus::Pending,
        };

        let queue = state.store.moderation_queue(status).await?;
        return Ok(Json(queue));
    }

    let own = state.store.submissions_for_user(auth.user_id).await?;
    Ok(Json(own))
}

/// Submit a new supplier for moderation
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    tag = "suppliers",
    responses(
        (status = 201, description = "Submission created"),
        (status = 400, description = "Missing company name"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_supplier(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(submission): Json<NewSubmission>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if submission.company_name.trim().is_empty() {
        return Err(AppError::BadRequest("Company name is required".to_string()));
    }

    let created = state
        .store
        .insert_submission(auth.user_id, &submission)
        .await?;

    tracing::info!(submission_id = created.id, user_id = auth.user_id, "supplier submitted");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Approve or reject a pending submission (admin only)
///
/// Approval copies the submission into the live suppliers table; both
/// actions stamp moderation metadata. A submission transitions out of
/// `pending` exactly once: re-moderation finds no pending row and
/// returns 404.
#[utoipa::path(
    put,
    path = "/api/v1/suppliers",
    tag = "suppliers",
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Moderation applied", body = ModerationResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "No pending submission with this id")
    )
)]
pub async fn moderate_supplier(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<ModerationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    require_admin(&state, &auth).await?;

    let (Some(supplier_id), Some(action)) = (req.supplier_id, req.action.as_deref()) else {
        return Err(AppError::BadRequest("Invalid request".to_string()));
    };

    let applied = match action {
        "approve" => {
            state
                .store
                .approve_submission(supplier_id, auth.user_id)
                .await?
        }
        "reject" => {
            state
                .store
                .reject_submission(supplier_id, auth.user_id, req.rejection_reason.as_deref())
                .await?
        }
        _ => return Err(AppError::BadRequest("Invalid request".to_string())),
    };

    if !applied {
        return Err(AppError::NotFound("Pending submission not found".to_string()));
    }

    tracing::info!(supplier_id, action, moderator = auth.user_id, "submission moderated");
    Ok(Json(ModerationResponse {
        success: true,
        action: action.to_string(),
    }))
}

/// Delete an own submission
///
/// The affected-row count is honored: deleting an id that does not exist
/// (or belongs to someone else) returns 404, so a second delete of the
/// same id is not success-shaped.
#[utoipa::path(
    delete,
    path = "/api/v1/suppliers",
    tag = "suppliers",
    params(DeleteQuery),
    responses(
        (status = 200, description = "Submission deleted"),
        (status = 400, description = "Missing id"),
        (status = 404, description = "Submission not found")
    )
)]
pub async fn delete_supplier(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(params): Query<DeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let Some(id) = params.id else {
        return Err(AppError::BadRequest("Supplier ID is required".to_string()));
    };

    let deleted = state.store.delete_submission(id, auth.user_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Supplier not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
