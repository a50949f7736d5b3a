use anyhow::Result;
use chrono::{DateTime, Utc};
use tradesignal_common::{hash_url, Link, LinkStatus};

use crate::Store;

type LinkTuple = (String, String, String, String, DateTime<Utc>);

impl Store {
    /// Upsert discovered URLs for a source in one statement. A URL hashes to
    /// the same id every time, so re-discovery is a no-op and existing
    /// statuses are untouched. Returns how many rows were actually inserted.
    pub async fn insert_links(&self, source: &str, urls: &[String]) -> Result<u32> {
        if urls.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = urls.iter().map(|u| hash_url(u)).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO article_links (id, url, source, status)
            SELECT t.id, t.url, $3, 'new'
            FROM unnest($1::text[], $2::text[]) AS t (id, url)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(urls)
        .bind(source)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as u32)
    }

    /// Links awaiting a scrape attempt: everything not yet terminal. The
    /// source filter is part of the query so it applies before the limit.
    pub async fn scrape_candidates(
        &self,
        sources: Option<&[String]>,
        limit: u32,
    ) -> Result<Vec<Link>> {
        let rows = sqlx::query_as::<_, LinkTuple>(
            r#"
            SELECT id, url, source, status, discovered_at
            FROM article_links
            WHERE status IN ('new', 'pending')
              AND ($2::text[] IS NULL OR source = ANY($2))
            ORDER BY discovered_at
            LIMIT $1
            "#,
        )
        .bind(limit.min(1000) as i64)
        .bind(sources.map(|s| s.to_vec()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_link).collect())
    }

    pub async fn list_links_by_status(&self, status: LinkStatus, limit: u32) -> Result<Vec<Link>> {
        let rows = sqlx::query_as::<_, LinkTuple>(
            r#"
            SELECT id, url, source, status, discovered_at
            FROM article_links
            WHERE status = $1
            ORDER BY discovered_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.as_str())
        .bind(limit.min(1000) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_link).collect())
    }

    /// Flip a link to a terminal status. Guarded so an already-terminal row is
    /// never overwritten.
    pub async fn mark_link(&self, link_id: &str, status: LinkStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE article_links
            SET status = $2
            WHERE id = $1 AND status IN ('new', 'pending')
            "#,
        )
        .bind(link_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Distinct source names that have contributed at least one link.
    pub async fn known_sources(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT DISTINCT source FROM article_links ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}

fn row_to_link(r: LinkTuple) -> Link {
    Link {
        id: r.0,
        url: r.1,
        source: r.2,
        status: LinkStatus::parse(&r.3).unwrap_or(LinkStatus::Failed),
        discovered_at: r.4,
    }
}
