//! HTTP service.
//!
//! Routes:
//!
//! - `GET /`         liveness message, no auth
//! - `POST /predict` one-record prediction, guarded by the API key header
//!
//! The fitted pipeline lives in [`AppState`] behind an `Arc` and is never
//! mutated after startup.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::AppError;
use crate::inference::InferenceService;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod payload;

pub use auth::ApiKeyConfig;
pub use error::ApiError;
pub use payload::{FieldError, PredictRequest, PredictResponse};

/// Shared, read-only request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: InferenceService,
    pub api_key: ApiKeyConfig,
}

pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route("/predict", post(handlers::predict))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key))
        .route("/", get(handlers::root))
        .layer(middleware::from_fn(handlers::log_requests))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::serve(format!("Failed to bind {addr}: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| AppError::serve(format!("Failed to read bound address: {e}")))?;
    info!("Property valuation API listening on {local}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::serve(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::domain::DEFAULT_CATEGORICAL;
    use crate::fit::{TrainingParams, create_pipeline};
    use crate::models::ModelParams;
    use crate::preprocess::{EncoderParams, UnknownCategory};
    use crate::testing::synthetic_table;

    const KEY: &str = "test-key";

    fn app() -> Router {
        app_with(UnknownCategory::Prior)
    }

    fn app_with(handle_unknown: UnknownCategory) -> Router {
        let (x, y) = synthetic_table(60, 21).split_target().unwrap();
        let params = TrainingParams {
            model: ModelParams {
                n_estimators: 15,
                ..ModelParams::default()
            },
            encoder: EncoderParams {
                handle_unknown,
                ..EncoderParams::default()
            },
            ..TrainingParams::default()
        };
        let pipeline = create_pipeline(&DEFAULT_CATEGORICAL, &params).unwrap().fit(&x, &y).unwrap();
        router(AppState {
            service: InferenceService::from_pipeline(pipeline),
            api_key: ApiKeyConfig::new("api_key", KEY).unwrap(),
        })
    }

    fn valid_body() -> Value {
        json!({
            "type": "casa",
            "sector": "vitacura",
            "net_usable_area": 152.0,
            "net_area": 257.0,
            "n_rooms": 3.0,
            "n_bathroom": 3.0,
            "latitude": -33.3794,
            "longitude": -70.5447
        })
    }

    fn predict_request(key: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::post("/predict").header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("api_key", key);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_needs_no_key() {
        for key in [None, Some("wrong")] {
            let mut builder = Request::get("/");
            if let Some(key) = key {
                builder = builder.header("api_key", key);
            }
            let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                json_body(response).await,
                json!({ "message": "Property valuation API is running" })
            );
        }
    }

    #[tokio::test]
    async fn correct_key_returns_prediction() {
        let response = app()
            .oneshot(predict_request(Some(KEY), valid_body().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["prediction"].as_f64().unwrap().is_finite());
    }

    #[tokio::test]
    async fn wrong_or_missing_key_is_forbidden_even_with_bad_body() {
        for key in [None, Some("nope")] {
            let response = app()
                .oneshot(predict_request(key, "{not json".to_string()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(json_body(response).await, json!({ "detail": "Invalid API Key" }));
        }
    }

    #[tokio::test]
    async fn missing_field_is_unprocessable() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("latitude");
        let response = app().oneshot(predict_request(Some(KEY), body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail = &json_body(response).await["detail"];
        assert_eq!(detail[0]["loc"], json!(["body", "latitude"]));
        assert_eq!(detail[0]["type"], "missing");
    }

    #[tokio::test]
    async fn inference_failure_is_a_server_error() {
        let mut body = valid_body();
        body["sector"] = json!("atlantis");
        let response = app_with(UnknownCategory::Error)
            .oneshot(predict_request(Some(KEY), body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("atlantis"), "{detail}");
    }

    #[tokio::test]
    async fn unseen_category_uses_prior_by_default() {
        let mut body = valid_body();
        body["sector"] = json!("atlantis");
        let response = app().oneshot(predict_request(Some(KEY), body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_unprocessable() {
        let response = app()
            .oneshot(predict_request(Some(KEY), "{not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn numeric_strings_match_numbers() {
        let app = app();
        let numeric = app
            .clone()
            .oneshot(predict_request(Some(KEY), valid_body().to_string()))
            .await
            .unwrap();
        let mut stringly = valid_body();
        stringly["n_rooms"] = json!("3");
        stringly["latitude"] = json!("-33.3794");
        let coerced = app.oneshot(predict_request(Some(KEY), stringly.to_string())).await.unwrap();

        assert_eq!(coerced.status(), StatusCode::OK);
        assert_eq!(json_body(numeric).await, json_body(coerced).await);
    }
}
