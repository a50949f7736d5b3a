use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use tradesignal_common::Config;
use tradesignal_pipeline::sources::EconomyMiddleEast;
use tradesignal_pipeline::{Pipeline, PipelineBuilder};
use tradesignal_store::Store;

mod rest;

pub struct AppState {
    pub pipeline: Pipeline,
    pub store: Store,
    pub embedder: OpenAi,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tradesignal=info".parse()?))
        .init();

    let config = Config::from_env();

    let store = Store::connect(&config.database_url).await?;

    let agent = OpenAi::new(&config.openai_api_key, &config.chat_model)
        .with_embedding_model(&config.embedding_model);

    let http = reqwest::Client::new();
    let pipeline = PipelineBuilder::new(
        Arc::new(store.clone()),
        Arc::new(agent.clone()),
        Arc::new(agent.clone()),
    )
    .with_source(Arc::new(EconomyMiddleEast::new(http)))
    .build();

    let state = Arc::new(AppState {
        pipeline,
        store,
        embedder: agent,
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Pipeline control
        .route("/api/pipeline/run", post(rest::pipeline::run_full))
        .route("/api/pipeline/stages/{stage}", post(rest::pipeline::run_stage))
        .route("/api/pipeline/stop", post(rest::pipeline::stop))
        .route("/api/pipeline/status", get(rest::pipeline::status))
        // Run records
        .route("/api/pipelines", get(rest::data::list_runs))
        .route("/api/pipelines/{id}", get(rest::data::run_detail))
        // Corpus
        .route("/api/sources", get(rest::data::sources))
        .route("/api/links/new", get(rest::data::new_links))
        .route("/api/stats/articles", get(rest::data::article_stats))
        .route("/api/search", post(rest::data::search))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Trade Signal API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
