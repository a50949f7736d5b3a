use anyhow::Result;
use chrono::{DateTime, Utc};
use tradesignal_common::{PipelineRun, RunCounter, RunState};

use crate::Store;

type RunTuple = (
    i64,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    String,
    i32,
    i32,
    i32,
    i32,
    Option<serde_json::Value>,
    Option<String>,
);

const RUN_COLUMNS: &str = r#"
    id, start_time, end_time, status,
    new_links_found, articles_scraped, articles_embedded, entities_analyzed,
    scraper_stats, details
"#;

impl Store {
    /// Open a new RUNNING run record and return its id.
    pub async fn create_run(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO pipeline_runs (status) VALUES ('RUNNING') RETURNING id",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Atomically bump one counter column on a run record.
    pub async fn bump_counter(&self, run_id: i64, counter: RunCounter, by: i32) -> Result<()> {
        let sql = format!(
            "UPDATE pipeline_runs SET {col} = {col} + $2 WHERE id = $1",
            col = counter.column()
        );

        sqlx::query(&sql)
            .bind(run_id)
            .bind(by)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Attach per-source discovery counts to the run record.
    pub async fn set_scraper_stats(&self, run_id: i64, stats: serde_json::Value) -> Result<()> {
        sqlx::query("UPDATE pipeline_runs SET scraper_stats = $2 WHERE id = $1")
            .bind(run_id)
            .bind(stats)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Close a run record with its terminal state. Guarded so a run is only
    /// finalized once.
    pub async fn finalize_run(
        &self,
        run_id: i64,
        status: RunState,
        details: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pipeline_runs
            SET status = $2, details = $3, end_time = now()
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_runs(&self, limit: u32) -> Result<Vec<PipelineRun>> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM pipeline_runs ORDER BY start_time DESC LIMIT $1"
        );

        let rows = sqlx::query_as::<_, RunTuple>(&sql)
            .bind(limit.min(200) as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(row_to_run).collect())
    }

    pub async fn find_run(&self, run_id: i64) -> Result<Option<PipelineRun>> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE id = $1");

        let row = sqlx::query_as::<_, RunTuple>(&sql)
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_run))
    }
}

fn row_to_run(r: RunTuple) -> PipelineRun {
    PipelineRun {
        id: r.0,
        start_time: r.1,
        end_time: r.2,
        status: RunState::parse(&r.3).unwrap_or(RunState::Failed),
        new_links_found: r.4,
        articles_scraped: r.5,
        articles_embedded: r.6,
        entities_analyzed: r.7,
        scraper_stats: r.8,
        details: r.9,
    }
}
