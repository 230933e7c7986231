// Application error type and its conversion into the JSON response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    // Malformed inbound filter or query, reported as-is and never retried
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    // Only surfaced when no local fallback exists
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("Internal server error: {0:#}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Every error leaves the API wrapped as {success: false, error: "..."}
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::InternalServerError(e) => {
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                "Internal Server Error".to_string()
            }
            AppError::ExternalService(message) => {
                tracing::error!("External service failure with no fallback: {}", message);
                self.to_string()
            }
            AppError::Validation(message) => {
                tracing::warn!("Rejected request: {}", message);
                message.clone()
            }
            AppError::NotFound(message) => {
                tracing::info!("Not found: {}", message);
                message.clone()
            }
        };

        (status, Json(ApiResponse::<()>::failure(error_message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
