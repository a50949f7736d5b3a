// Production binding of PipelineStore to the Postgres-backed Store.

use anyhow::Result;
use async_trait::async_trait;
use tradesignal_common::{
    ArticleAnalysis, ItemStatus, Link, LinkStatus, NewArticle, PendingArticle, RunCounter, RunState,
};
use tradesignal_store::articles::WorkerColumn;
use tradesignal_store::Store;
use uuid::Uuid;

use crate::traits::PipelineStore;

#[async_trait]
impl PipelineStore for Store {
    async fn insert_links(&self, source: &str, urls: &[String]) -> Result<u32> {
        Store::insert_links(self, source, urls).await
    }

    async fn scrape_candidates(&self, sources: Option<&[String]>, limit: u32) -> Result<Vec<Link>> {
        Store::scrape_candidates(self, sources, limit).await
    }

    async fn mark_link(&self, link_id: &str, status: LinkStatus) -> Result<()> {
        Store::mark_link(self, link_id, status).await
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<Uuid> {
        Store::insert_article(self, article).await
    }

    async fn pending_embeddings(&self, limit: u32) -> Result<Vec<PendingArticle>> {
        self.pending_articles(WorkerColumn::Embedding, limit).await
    }

    async fn record_embedding(
        &self,
        article: &PendingArticle,
        embedding: Vec<f32>,
        model: &str,
    ) -> Result<()> {
        Store::record_embedding(self, article, embedding, model).await
    }

    async fn mark_embedding(&self, article_id: Uuid, status: ItemStatus) -> Result<()> {
        self.mark_article(article_id, WorkerColumn::Embedding, status)
            .await
    }

    async fn pending_analysis(&self, limit: u32) -> Result<Vec<PendingArticle>> {
        self.pending_articles(WorkerColumn::Analysis, limit).await
    }

    async fn record_analysis(&self, article_id: Uuid, analysis: &ArticleAnalysis) -> Result<()> {
        Store::record_analysis(self, article_id, analysis).await
    }

    async fn mark_analysis(&self, article_id: Uuid, status: ItemStatus) -> Result<()> {
        self.mark_article(article_id, WorkerColumn::Analysis, status)
            .await
    }

    async fn create_run(&self) -> Result<i64> {
        Store::create_run(self).await
    }

    async fn bump_counter(&self, run_id: i64, counter: RunCounter, by: i32) -> Result<()> {
        Store::bump_counter(self, run_id, counter, by).await
    }

    async fn set_scraper_stats(&self, run_id: i64, stats: serde_json::Value) -> Result<()> {
        Store::set_scraper_stats(self, run_id, stats).await
    }

    async fn finalize_run(
        &self,
        run_id: i64,
        status: RunState,
        details: Option<&str>,
    ) -> Result<()> {
        Store::finalize_run(self, run_id, status, details).await
    }
}
