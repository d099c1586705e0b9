//! Route handlers and request logging.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::payload::{FieldError, PredictRequest, PredictResponse};

/// Liveness message.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Property valuation API is running" }))
}

/// Predict the price of one property.
pub async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<PredictResponse>, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(vec![FieldError::invalid_json(&e.to_string())]))?;
    let request = PredictRequest::from_json(&value).map_err(ApiError::Validation)?;

    let prediction = state.service.predict_one(request.into())?;
    info!(prediction, "Prediction served");
    Ok(Json(PredictResponse { prediction }))
}

/// Log method, path and response status of every request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    info!("Request: {} {}", request.method(), request.uri());
    let response = next.run(request).await;
    info!("Response status: {}", response.status().as_u16());
    response
}
