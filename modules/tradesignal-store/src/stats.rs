use anyhow::Result;
use serde::Serialize;

use crate::Store;

/// Aggregate progress counts across the corpus, for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleStats {
    pub total_links: i64,
    pub links_new: i64,
    pub links_success: i64,
    pub links_failed: i64,
    pub total_articles: i64,
    pub articles_embedded: i64,
    pub articles_analyzed: i64,
    pub analyses_tender: i64,
    pub analyses_sentiment: i64,
    pub companies_positive: i64,
    pub companies_negative: i64,
    pub companies_neutral: i64,
}

impl Store {
    pub async fn article_stats(&self) -> Result<ArticleStats> {
        let links = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT count(*),
                   count(*) FILTER (WHERE status = 'new'),
                   count(*) FILTER (WHERE status = 'success'),
                   count(*) FILTER (WHERE status = 'failed')
            FROM article_links
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let articles = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT count(*),
                   count(*) FILTER (WHERE embedding_status = 'success'),
                   count(*) FILTER (WHERE analysis_status = 'success')
            FROM scraped_articles
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let analyses = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT count(*) FILTER (WHERE mode = 'Tender'),
                   count(*) FILTER (WHERE mode = 'Sentiment')
            FROM article_analysis
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let companies = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT count(*) FILTER (WHERE sentiment = 'Positive'),
                   count(*) FILTER (WHERE sentiment = 'Negative'),
                   count(*) FILTER (WHERE sentiment = 'Neutral')
            FROM company_analysis
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ArticleStats {
            total_links: links.0,
            links_new: links.1,
            links_success: links.2,
            links_failed: links.3,
            total_articles: articles.0,
            articles_embedded: articles.1,
            articles_analyzed: articles.2,
            analyses_tender: analyses.0,
            analyses_sentiment: analyses.1,
            companies_positive: companies.0,
            companies_negative: companies.1,
            companies_neutral: companies.2,
        })
    }
}
