//! HTTP handlers.
//!
//! - `resolve`: the incident resolution endpoint
//! - `health`: liveness, readiness and Prometheus metrics

pub mod health;
pub mod resolve;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// `GET /` service info.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Incident Resolver",
        "version": env!("CARGO_PKG_VERSION"),
        "prompt_template": resolver::PROMPT_TEMPLATE_VERSION,
        "endpoints": [
            "POST /api/resolve",
            "GET /health",
            "GET /ready",
            "GET /metrics"
        ]
    })))
}

pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
