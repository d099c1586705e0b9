//! Static API-key guard.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::error::ApiError;
use super::AppState;
use crate::error::AppError;

/// Header name and expected secret.
#[derive(Debug, Clone)]
pub struct ApiKeyConfig {
    header: HeaderName,
    secret: String,
}

impl ApiKeyConfig {
    pub fn new(header: &str, secret: impl Into<String>) -> Result<Self, AppError> {
        let header = HeaderName::try_from(header.trim().to_ascii_lowercase())
            .map_err(|e| AppError::config(format!("Invalid API key header name `{header}`: {e}")))?;
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AppError::config("API key must not be empty."));
        }
        Ok(Self { header, secret })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Exact match of the presented key against the secret, compared in
    /// constant time for keys of the secret's length.
    pub fn verify(&self, presented: Option<&[u8]>) -> bool {
        presented.is_some_and(|key| bool::from(key.ct_eq(self.secret.as_bytes())))
    }
}

/// Reject the request with 403 unless it carries the configured key.
///
/// Runs before the handler extracts the body, so a bad key wins over a bad body.
pub async fn require_api_key(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(state.api_key.header())
        .map(|v| v.as_bytes());
    if !state.api_key.verify(presented) {
        warn!("Unauthorized access attempt with invalid API key");
        return ApiError::Forbidden.into_response();
    }
    next.run(request).await
}
