use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::ElectiveRangeError;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Elective not valid for this student")]
    InvalidSelection,

    #[error("You have already registered for this elective slot")]
    SlotAlreadyFilled,

    /// Uniqueness violations answered with 400.
    #[error("{0}")]
    Duplicate(String),

    /// Uniqueness violations answered with 409.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidSelection
            | AppError::SlotAlreadyFilled
            | AppError::Duplicate(_)
            | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Store(e) => {
                error!("Store failure: {e}");
                json!({ "msg": "Server error", "error": e.to_string() })
            }
            AppError::Internal(detail) => {
                error!("Internal failure: {detail}");
                json!({ "msg": "Server error", "error": detail })
            }
            other => json!({ "msg": other.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ElectiveRangeError> for AppError {
    fn from(e: ElectiveRangeError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::Internal(e.to_string())
    }
}
