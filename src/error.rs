use crate::domain::ProposalId;
use crate::orchestration::WorkflowError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A required write did not reach the store; nothing was recorded.
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Partial failure: {message}")]
    PartialFailure {
        message: String,
        rejected: Vec<ProposalId>,
    },
}

impl AppError {
    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "invalid_input",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Conflict(_) => "conflict",
            AppError::Persistence(_) => "persistence",
            AppError::PartialFailure { .. } => "partial_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_)
            | AppError::Internal(_)
            | AppError::Persistence(_)
            | AppError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidState(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Unauthenticated => AppError::Unauthenticated,
            WorkflowError::NotFound(msg) => AppError::NotFound(msg),
            WorkflowError::Forbidden(msg) => AppError::Forbidden(msg),
            WorkflowError::InvalidState(msg) => AppError::InvalidState(msg),
            WorkflowError::Conflict(msg) => AppError::Conflict(msg),
            WorkflowError::InvalidInput(msg) => AppError::BadRequest(msg),
            WorkflowError::PartialFailure { message, rejected } => {
                AppError::PartialFailure { message, rejected }
            }
            WorkflowError::Persistence(e) => AppError::Persistence(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }

        let body = match self {
            AppError::PartialFailure { message, rejected } => Json(json!({
                "error": message,
                "code": code,
                "rejected": rejected,
            })),
            AppError::Unauthenticated => Json(json!({
                "error": "authentication required",
                "code": code,
            })),
            AppError::Config(msg)
            | AppError::Internal(msg)
            | AppError::Persistence(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::InvalidState(msg)
            | AppError::Conflict(msg) => Json(json!({
                "error": msg,
                "code": code,
            })),
        };

        (status, body).into_response()
    }
}
