// Trait boundaries of the pipeline.
//
// Four seams, one per external dependency:
// - PipelineStore — persistence (Postgres in production)
// - NewsSource — one news site: link discovery + article fetch
// - EmbeddingProvider — text → vector
// - ArticleClassifier — text → structured analysis
//
// Everything inside the stage workers and the orchestrator is written against
// these traits, so integration tests run with in-memory mocks.

use anyhow::Result;
use async_trait::async_trait;
use tradesignal_common::{
    ArticleAnalysis, ArticleContent, ItemStatus, Link, LinkStatus, NewArticle, PendingArticle,
    RunCounter, RunState,
};
use uuid::Uuid;

#[async_trait]
pub trait PipelineStore: Send + Sync {
    // -- links --

    /// Upsert discovered URLs; returns how many were actually new.
    async fn insert_links(&self, source: &str, urls: &[String]) -> Result<u32>;

    /// Links not yet in a terminal status, oldest first. A source filter is
    /// applied before the batch limit so filtered runs never starve behind a
    /// backlog from other sources.
    async fn scrape_candidates(&self, sources: Option<&[String]>, limit: u32) -> Result<Vec<Link>>;

    /// Flip a link to a terminal status; never overwrites a terminal one.
    async fn mark_link(&self, link_id: &str, status: LinkStatus) -> Result<()>;

    // -- articles --

    async fn insert_article(&self, article: &NewArticle) -> Result<Uuid>;

    async fn pending_embeddings(&self, limit: u32) -> Result<Vec<PendingArticle>>;

    /// Store the vector (denormalized with the article's source and date) and
    /// flip embedding status to success atomically.
    async fn record_embedding(
        &self,
        article: &PendingArticle,
        embedding: Vec<f32>,
        model: &str,
    ) -> Result<()>;

    async fn mark_embedding(&self, article_id: Uuid, status: ItemStatus) -> Result<()>;

    async fn pending_analysis(&self, limit: u32) -> Result<Vec<PendingArticle>>;

    /// Store analysis plus company rows and flip analysis status atomically.
    async fn record_analysis(&self, article_id: Uuid, analysis: &ArticleAnalysis) -> Result<()>;

    async fn mark_analysis(&self, article_id: Uuid, status: ItemStatus) -> Result<()>;

    // -- run records --

    async fn create_run(&self) -> Result<i64>;

    async fn bump_counter(&self, run_id: i64, counter: RunCounter, by: i32) -> Result<()>;

    async fn set_scraper_stats(&self, run_id: i64, stats: serde_json::Value) -> Result<()>;

    async fn finalize_run(
        &self,
        run_id: i64,
        status: RunState,
        details: Option<&str>,
    ) -> Result<()>;
}

/// One news site. Discovery yields candidate article URLs; fetch turns one
/// URL into parsed article content.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    async fn discover_links(&self) -> Result<Vec<String>>;

    async fn fetch_article(&self, url: &str) -> Result<ArticleContent>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier stored alongside each vector.
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait ArticleClassifier: Send + Sync {
    async fn classify(&self, article: &PendingArticle) -> Result<ArticleAnalysis>;
}
