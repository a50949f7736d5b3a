use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tradesignal_common::Stage;

use crate::AppState;

use super::error_response;

/// Optional request body for the run endpoints: restrict the run to the
/// named sources.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

/// POST /api/pipeline/run — start a full pipeline run.
pub async fn run_full(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RunRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    match state.pipeline.start_full(request.sources).await {
        Ok(run_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "started", "run_id": run_id })),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/pipeline/stages/{stage} — start a single-stage run.
pub async fn run_stage(
    State(state): State<Arc<AppState>>,
    Path(stage): Path<String>,
    body: Option<Json<RunRequest>>,
) -> impl IntoResponse {
    let stage: Stage = match stage.parse() {
        Ok(stage) => stage,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };

    let request = body.map(|Json(r)| r).unwrap_or_default();
    match state.pipeline.start_stage(stage, request.sources).await {
        Ok(run_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "status": "started",
                "stage": stage.slug(),
                "run_id": run_id,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/pipeline/stop — request a graceful stop of the running pipeline.
/// The in-flight item finishes; the run closes as STOPPED.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.stop() {
        Ok(()) => Json(serde_json::json!({ "status": "stopping" })).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/pipeline/status — live execution state.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.status())
}
