use tradesignal_common::{ItemStatus, PipelineError, RunCounter, Stage};
use tracing::{debug, warn};

use crate::status::StatusTracker;
use crate::traits::{EmbeddingProvider, PipelineStore};

use super::BATCH_LIMIT;

/// Embedding: vectorize every article still pending. The vector insert and
/// the status flip are one store transaction; a provider failure marks just
/// that article failed and moves on. Returns (articles embedded, failures).
pub async fn run(
    store: &dyn PipelineStore,
    embedder: &dyn EmbeddingProvider,
    status: &StatusTracker,
    run_id: i64,
) -> Result<(u32, u32), PipelineError> {
    status.set_stage(Stage::Embedding);
    let cancel = status.cancel_flag();

    let articles = store.pending_embeddings(BATCH_LIMIT).await?;
    let total = articles.len() as u32;
    status.update_progress(0, total);

    let mut embedded = 0u32;
    let mut failed = 0u32;

    for (done, article) in articles.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        match embedder.embed(&article.cleaned_text).await {
            Ok(vector) => {
                store
                    .record_embedding(article, vector, embedder.model())
                    .await?;
                store
                    .bump_counter(run_id, RunCounter::ArticlesEmbedded, 1)
                    .await?;
                embedded += 1;
                debug!(article_id = %article.id, "article embedded");
            }
            Err(e) => {
                warn!(article_id = %article.id, error = %e, "embedding failed");
                store.mark_embedding(article.id, ItemStatus::Failed).await?;
                failed += 1;
            }
        }

        status.update_progress(done as u32 + 1, total);
    }

    Ok((embedded, failed))
}
