use anyhow::Result;
use chrono::{DateTime, Utc};
use tradesignal_common::{ItemStatus, NewArticle, PendingArticle};
use uuid::Uuid;

use crate::Store;

/// Which per-article worker status a query or update targets.
#[derive(Debug, Clone, Copy)]
pub enum WorkerColumn {
    Embedding,
    Analysis,
}

impl WorkerColumn {
    // Static strings only, interpolated into SQL.
    fn column(&self) -> &'static str {
        match self {
            WorkerColumn::Embedding => "embedding_status",
            WorkerColumn::Analysis => "analysis_status",
        }
    }
}

impl Store {
    /// Insert a freshly scraped article. Both worker statuses start `pending`.
    /// Returns the new article id.
    pub async fn insert_article(&self, article: &NewArticle) -> Result<Uuid> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO scraped_articles
                (link_id, source, url, title, author, publication_date, raw_text, cleaned_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&article.link_id)
        .bind(&article.source)
        .bind(&article.url)
        .bind(&article.content.title)
        .bind(&article.content.author)
        .bind(article.content.publication_date)
        .bind(&article.content.raw_text)
        .bind(&article.content.cleaned_text)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Articles whose given worker status is still `pending`. Articles that
    /// cleaned down to nothing are left alone; there is no text to process.
    pub async fn pending_articles(
        &self,
        worker: WorkerColumn,
        limit: u32,
    ) -> Result<Vec<PendingArticle>> {
        let sql = format!(
            r#"
            SELECT id, source, publication_date, cleaned_text
            FROM scraped_articles
            WHERE {} = 'pending' AND cleaned_text <> ''
            ORDER BY scraped_at
            LIMIT $1
            "#,
            worker.column()
        );

        let rows = sqlx::query_as::<_, (Uuid, String, Option<DateTime<Utc>>, String)>(&sql)
            .bind(limit.min(1000) as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| PendingArticle {
                id: r.0,
                source: r.1,
                publication_date: r.2,
                cleaned_text: r.3,
            })
            .collect())
    }

    /// Flip a worker status. Guarded so a status already moved off `pending`
    /// is never overwritten.
    pub async fn mark_article(
        &self,
        article_id: Uuid,
        worker: WorkerColumn,
        status: ItemStatus,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE scraped_articles SET {col} = $2 WHERE id = $1 AND {col} = 'pending'",
            col = worker.column()
        );

        sqlx::query(&sql)
            .bind(article_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
