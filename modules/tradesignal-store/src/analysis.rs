use anyhow::Result;
use tradesignal_common::ArticleAnalysis;
use uuid::Uuid;

use crate::Store;

impl Store {
    /// Persist one article's extraction output and flip its analysis status to
    /// success, all in one transaction: the analysis row, every per-company
    /// sentiment row, and the status flip land together or not at all.
    pub async fn record_analysis(&self, article_id: Uuid, analysis: &ArticleAnalysis) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (Uuid,)>(
            r#"
            INSERT INTO article_analysis
                (article_id, mode, countries, commodities, contract_value, deadline)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (article_id) DO UPDATE SET
                mode = EXCLUDED.mode,
                countries = EXCLUDED.countries,
                commodities = EXCLUDED.commodities,
                contract_value = EXCLUDED.contract_value,
                deadline = EXCLUDED.deadline
            RETURNING id
            "#,
        )
        .bind(article_id)
        .bind(analysis.mode.as_str())
        .bind(&analysis.countries)
        .bind(&analysis.commodities)
        .bind(&analysis.contract_value)
        .bind(&analysis.deadline)
        .fetch_one(&mut *tx)
        .await?;

        let analysis_id = row.0;

        for company in &analysis.company_sentiments {
            sqlx::query(
                r#"
                INSERT INTO company_analysis
                    (analysis_id, company_name, sentiment, risk_type, reason_for_sentiment)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(analysis_id)
            .bind(&company.company_name)
            .bind(company.sentiment.as_str())
            .bind(company.risk_type.map(|r| r.as_str()))
            .bind(&company.reason_for_sentiment)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE scraped_articles
            SET analysis_status = 'success'
            WHERE id = $1 AND analysis_status = 'pending'
            "#,
        )
        .bind(article_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
