//! HTTP API
//!
//! - `GET /` welcome message
//! - `POST /predict` score one wine
//! - `GET /feature-importance` cached importances
//!
//! Errors carry a `{"detail": ...}` body. Validation failures use 422 with a per-field
//! description, an unloaded model 503, and any other inference failure 500.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::predict::PredictionService;
use crate::{FeatureImportance, PredictionResult, Result, ServerConfig, ValidationError, WineError};

/// Shared handler state
pub type AppState = Arc<PredictionService>;

/// Error response with a status and a JSON `detail`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: Value,
}

impl From<WineError> for ApiError {
    fn from(err: WineError) -> Self {
        match err {
            WineError::Validation(e) => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: validation_detail(&e),
            },
            WineError::ModelNotLoaded => ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                detail: Value::String(err.to_string()),
            },
            other => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: Value::String(other.to_string()),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            detail: Value::String(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("{}: {}", self.status, self.detail);
        } else {
            log::warn!("{}: {}", self.status, self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Field-level description in the shape `[{"loc": [...], "msg": ..., "type": ...}]`
fn validation_detail(err: &ValidationError) -> Value {
    let kind = match err {
        ValidationError::NotAnObject => "object_type",
        ValidationError::Missing { .. } => "missing",
        ValidationError::Invalid { .. } => "invalid",
    };
    let loc = match err.field() {
        Some(field) => json!(["body", field]),
        None => json!(["body"]),
    };
    json!([{ "loc": loc, "msg": err.to_string(), "type": kind }])
}

/// Build the router around a shared service
pub fn router(service: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/feature-importance", get(feature_importance))
        .layer(cors)
        .with_state(service)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &ServerConfig, service: PredictionService) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Wine Quality Predictor API" }))
}

async fn predict(
    State(service): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    let Json(body) = payload?;
    Ok(Json(service.predict(&body)?))
}

async fn feature_importance(
    State(service): State<AppState>,
) -> std::result::Result<Json<FeatureImportance>, ApiError> {
    Ok(Json(service.feature_importance()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactStore;
    use crate::predict::InferenceEngine;
    use crate::training::test_support::write_raw_data;
    use crate::training::Trainer;
    use crate::{QualityLabel, TrainingConfig};
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn unloaded_app() -> Router {
        router(Arc::new(PredictionService::new(InferenceEngine::unloaded())))
    }

    fn trained_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        write_raw_data(&data_dir, 60);
        let store = ArtifactStore::new(dir.path().join("models"));
        let config = TrainingConfig {
            n_estimators: 6,
            max_depth: 5,
            ..TrainingConfig::default()
        };
        Trainer::new(config).run(&data_dir, &store).unwrap();

        let service = PredictionService::new(InferenceEngine::load(&store));
        (dir, router(Arc::new(service)))
    }

    fn predict_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn sample_body() -> Value {
        serde_json::to_value(crate::features::WineFeatures::example()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_welcome() {
        let response = unloaded_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Welcome to Wine Quality Predictor API");
    }

    #[tokio::test]
    async fn test_predict_returns_score_label_and_importance() {
        let (_dir, app) = trained_app();
        let response = app.oneshot(predict_request(&sample_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: PredictionResult =
            serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(
            result.quality_label,
            QualityLabel::from_score(result.quality_score)
        );
        assert_eq!(result.feature_importance.len(), 12);
    }

    #[tokio::test]
    async fn test_predict_missing_field_is_422() {
        let (_dir, app) = trained_app();
        let mut body = sample_body();
        body.as_object_mut().unwrap().remove("alcohol");

        let response = app.oneshot(predict_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert_eq!(body["detail"][0]["loc"], json!(["body", "alcohol"]));
        assert_eq!(body["detail"][0]["type"], "missing");
    }

    #[tokio::test]
    async fn test_predict_without_model_is_server_error() {
        let response = unloaded_app()
            .oneshot(predict_request(&sample_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["detail"], "Model not loaded");
    }

    #[tokio::test]
    async fn test_predict_malformed_json_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = unloaded_app().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        assert!(json_body(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn test_feature_importance_empty_when_unloaded() {
        let response = unloaded_app()
            .oneshot(
                Request::builder()
                    .uri("/feature-importance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_feature_importance_when_trained() {
        let (_dir, app) = trained_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/feature-importance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let weights = body.as_object().unwrap();
        assert_eq!(weights.len(), 12);
        let names: Vec<String> = weights.keys().cloned().collect();
        assert_eq!(names, crate::features::WineFeatures::declared_order());
        let total: f64 = weights.values().map(|v| v.as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = unloaded_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
