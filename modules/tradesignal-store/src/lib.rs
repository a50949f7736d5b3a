pub mod analysis;
pub mod articles;
pub mod embeddings;
pub mod links;
pub mod runs;
pub mod search;
pub mod stats;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use search::SearchHit;
pub use stats::ArticleStats;

/// Postgres-backed persistence for links, articles, embeddings, analysis and
/// run records. Cheap to clone; wraps a connection pool.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect to Postgres and apply embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
