pub mod data;
pub mod pipeline;

use axum::http::StatusCode;
use axum::response::Json;
use tradesignal_common::PipelineError;

/// Map orchestrator errors onto HTTP statuses. Busy is a state conflict,
/// stopping an idle pipeline is a not-found, bad stage or source names are
/// client errors, the rest is 500.
pub(crate) fn error_response(e: &PipelineError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        PipelineError::Busy { .. } => StatusCode::CONFLICT,
        PipelineError::NotRunning => StatusCode::NOT_FOUND,
        PipelineError::UnknownSource(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

pub(crate) fn internal_error(e: &anyhow::Error) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal server error" })),
    )
}
