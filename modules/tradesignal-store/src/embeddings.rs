use anyhow::Result;
use pgvector::Vector;
use tradesignal_common::PendingArticle;

use crate::Store;

impl Store {
    /// Store an article's vector and flip its embedding status to success in
    /// one transaction, so a crash never leaves a vector without the status
    /// flip or vice versa. Source and publication date are denormalized onto
    /// the embedding row for filtered similarity queries.
    pub async fn record_embedding(
        &self,
        article: &PendingArticle,
        embedding: Vec<f32>,
        model: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO article_embeddings (article_id, embedding, model, source, publication_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (article_id) DO NOTHING
            "#,
        )
        .bind(article.id)
        .bind(Vector::from(embedding))
        .bind(model)
        .bind(&article.source)
        .bind(article.publication_date)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE scraped_articles
            SET embedding_status = 'success'
            WHERE id = $1 AND embedding_status = 'pending'
            "#,
        )
        .bind(article.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
