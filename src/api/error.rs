//! HTTP error type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use super::payload::FieldError;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid API Key")]
    Forbidden,
    #[error("Request validation failed ({} errors)", .0.len())]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Forbidden => json!({ "detail": "Invalid API Key" }),
            ApiError::Validation(errors) => json!({ "detail": errors }),
            ApiError::Internal(e) => {
                error!("Prediction failed: {e}");
                json!({ "detail": format!("Prediction failed: {e}") })
            }
        };
        (status, Json(body)).into_response()
    }
}
