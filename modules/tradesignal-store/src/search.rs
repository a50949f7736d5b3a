use anyhow::Result;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::Serialize;
use uuid::Uuid;

use crate::Store;

/// One nearest-neighbour match from semantic search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub article_id: Uuid,
    pub title: String,
    pub url: String,
    pub source: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub snippet: String,
    pub distance: f64,
}

impl Store {
    /// K-nearest-neighbour search over article embeddings by cosine distance.
    pub async fn search_articles(&self, query: Vec<f32>, limit: u32) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query_as::<
            _,
            (Uuid, String, String, String, Option<DateTime<Utc>>, String, f64),
        >(
            r#"
            SELECT a.id, a.title, a.url, a.source, a.publication_date,
                   left(a.cleaned_text, 240) AS snippet,
                   e.embedding <=> $1 AS distance
            FROM article_embeddings e
            JOIN scraped_articles a ON a.id = e.article_id
            ORDER BY e.embedding <=> $1
            LIMIT $2
            "#,
        )
        .bind(Vector::from(query))
        .bind(limit.min(100) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SearchHit {
                article_id: r.0,
                title: r.1,
                url: r.2,
                source: r.3,
                publication_date: r.4,
                snippet: r.5,
                distance: r.6,
            })
            .collect())
    }
}
