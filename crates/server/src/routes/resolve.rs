use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use resolver::ResolutionResult;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(default)]
    pub incident_text: Option<String>,
}

/// `POST /api/resolve`
///
/// Any body that does not yield a non-blank `incidentText` string is a 400;
/// every pipeline failure past validation is a generic 500.
pub async fn resolve_incident(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> ServerResult<Json<ResolutionResult>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(reason = %rejection.body_text(), "rejected resolve body");
        ServerError::InvalidInput
    })?;

    let text = request.incident_text.unwrap_or_default();
    let result = state.pipeline.resolve(&text).await?;
    Ok(Json(result))
}
