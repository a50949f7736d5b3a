use std::sync::Arc;

use ai_client::EmbedAgent;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tradesignal_common::LinkStatus;

use crate::AppState;

use super::internal_error;

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// GET /api/pipelines — recent run records, newest first.
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match state.store.list_runs(params.limit).await {
        Ok(runs) => Json(runs).into_response(),
        Err(e) => internal_error(&e).into_response(),
    }
}

/// GET /api/pipelines/{id} — one run. Returns the live snapshot while this
/// run is in flight, the persisted record afterwards.
pub async fn run_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let live = state.pipeline.status();
    if live.is_running && live.run_id == Some(id) {
        return Json(live).into_response();
    }

    match state.store.find_run(id).await {
        Ok(Some(run)) => Json(run).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no pipeline run {id}") })),
        )
            .into_response(),
        Err(e) => internal_error(&e).into_response(),
    }
}

/// GET /api/sources — registered source modules.
pub async fn sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "sources": state.pipeline.source_names() }))
}

/// GET /api/links/new — links discovered but not yet scraped.
pub async fn new_links(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match state
        .store
        .list_links_by_status(LinkStatus::New, params.limit)
        .await
    {
        Ok(links) => Json(links).into_response(),
        Err(e) => internal_error(&e).into_response(),
    }
}

/// GET /api/stats/articles — aggregate corpus counts.
pub async fn article_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.article_stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => internal_error(&e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// POST /api/search — semantic search over article embeddings.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> impl IntoResponse {
    if request.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "query must not be empty" })),
        )
            .into_response();
    }

    let vector = match state.embedder.embed(request.query.clone()).await {
        Ok(v) => v,
        Err(e) => return internal_error(&e).into_response(),
    };

    match state.store.search_articles(vector, request.limit).await {
        Ok(hits) => Json(hits).into_response(),
        Err(e) => internal_error(&e).into_response(),
    }
}
