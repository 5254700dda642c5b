use axum::{Json, response::IntoResponse};
use http::StatusCode;
use serde_json::json;

/// Liveness text at `/`
pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, "mirage image proxy ok")
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
