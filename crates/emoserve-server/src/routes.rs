//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use emoserve_core::{PredictRequest, PredictResponse};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::state::AppState;
use crate::telemetry;

/// The only verb supported on `/v1/models/{name}:{verb}`
const PREDICT_VERB: &str = "predict";

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.adapter.limits().max_body_bytes;

    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/v1/models", get(list_models))
        .route("/v1/models/:target", get(model_status).post(model_action))
        .route("/v2/health/live", get(v2_live))
        .route("/v2/health/ready", get(v2_ready))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "status": "alive" }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

async fn list_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "models": [state.adapter.name()] }))
}

async fn model_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    ensure_model(&state, &name)?;

    Ok(Json(json!({
        "name": state.adapter.name(),
        "ready": state.adapter.is_ready(),
        "labels": state.adapter.labels(),
    })))
}

/// `POST /v1/models/{name}:predict`
async fn model_action(
    State(state): State<AppState>,
    Path(target): Path<String>,
    headers: HeaderMap,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let (name, verb) = target
        .split_once(':')
        .ok_or_else(|| AppError::NotFound(format!("No verb in path '{}'", target)))?;

    ensure_model(&state, name)?;

    if verb != PREDICT_VERB {
        return Err(AppError::NotFound(format!(
            "Unsupported verb '{}' for model '{}'",
            verb, name
        )));
    }

    let Json(request) = body?;
    let response = state.adapter.predict(request, &headers).await?;

    Ok(Json(response))
}

async fn v2_live() -> Json<serde_json::Value> {
    Json(json!({ "live": true }))
}

async fn v2_ready(State(state): State<AppState>) -> Response {
    let ready = state.adapter.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(json!({ "ready": ready }))).into_response()
}

async fn fallback() -> AppError {
    AppError::NotFound("Not found".to_string())
}

fn ensure_model(state: &AppState, name: &str) -> Result<(), AppError> {
    if name == state.adapter.name() {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Model '{}' not found", name)))
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    PayloadTooLarge(String),
    NotFound(String),
    NotReady(String),
    InferenceError(String),
    InternalError(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) | AppError::PayloadTooLarge(_) => "invalid_request_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::NotReady(_) => "not_ready_error",
            AppError::InferenceError(_) | AppError::InternalError(_) => "inference_error",
        }
    }
}

impl From<emoserve_core::Error> for AppError {
    fn from(err: emoserve_core::Error) -> Self {
        use emoserve_core::Error;

        match err {
            Error::InvalidInput(msg) => AppError::InvalidRequest(msg),
            Error::NotReady(name) => {
                AppError::NotReady(format!("Model '{}' is not ready", name))
            }
            Error::Classifier(msg) => AppError::InferenceError(msg),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::InvalidRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::NotReady(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::InferenceError(msg) | AppError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", message);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", message);
        }
        telemetry::record_error(kind);

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
