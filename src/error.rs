use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use tracing::error;

use crate::engine::EngineError;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    /// Logs the cause and hides it from the caller.
    pub fn internal<E: Display>(error: E) -> Self {
        error!(error = %error, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            success: false,
            message: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Unauthorized(message) => AppError::new(StatusCode::UNAUTHORIZED, message),
            EngineError::Forbidden(message) => AppError::new(StatusCode::FORBIDDEN, message),
            EngineError::NotFound(message) | EngineError::NoCandidates(message) => {
                AppError::new(StatusCode::NOT_FOUND, message)
            }
            EngineError::Validation(message) | EngineError::DuplicateRequest(message) => {
                AppError::bad_request(message)
            }
            EngineError::AlreadyAssigned(message)
            | EngineError::AlreadyExists(message)
            | EngineError::RoleExclusion(message)
            | EngineError::Conflict(message) => AppError::new(StatusCode::CONFLICT, message),
            EngineError::Unavailable(message) => {
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            EngineError::Internal(message) => AppError::internal(message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::from(EngineError::from(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        AppError::bad_request(value.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}
