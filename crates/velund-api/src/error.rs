//! API error handling
//!
//! Maps domain errors onto HTTP status codes with the `{"error": <message>}`
//! body shape the frontend expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use velund_core::VelundError;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    MethodNotAllowed,
    Upstream(String),
    Database(String),
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            // Upstream and storage details go to the log, not the client
            AppError::Upstream(_) => "AI service unavailable".to_string(),
            AppError::Database(_) => "Database operation failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(detail) => tracing::error!(detail, "upstream LLM failure"),
            AppError::Database(detail) => tracing::error!(detail, "database failure"),
            AppError::Internal(detail) => tracing::error!(detail, "internal error"),
            _ => {}
        }

        let body = json!({ "error": self.message() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<VelundError> for AppError {
    fn from(err: VelundError) -> Self {
        match err {
            VelundError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            VelundError::AccessDenied { reason } => AppError::Forbidden(reason),
            VelundError::ValidationError(msg) => AppError::BadRequest(msg),
            VelundError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".to_string())
            }
            VelundError::DatabaseError(msg) => AppError::Database(msg),
            VelundError::LlmError(msg) => AppError::Upstream(msg),
            VelundError::ConfigError(msg) => AppError::Internal(format!("Configuration: {msg}")),
            VelundError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400() {
        let err: AppError = VelundError::ValidationError("Message is required".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Message is required");
    }

    #[test]
    fn llm_error_maps_to_502_without_leaking_detail() {
        let err: AppError = VelundError::LlmError("connection refused".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(!err.message().contains("connection refused"));
    }

    #[test]
    fn invalid_credentials_map_to_401() {
        let err: AppError = VelundError::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
