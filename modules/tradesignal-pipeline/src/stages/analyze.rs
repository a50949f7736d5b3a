use tradesignal_common::{AnalysisMode, ItemStatus, PipelineError, RunCounter, Stage};
use tracing::{debug, warn};

use crate::status::StatusTracker;
use crate::traits::{ArticleClassifier, PipelineStore};

use super::BATCH_LIMIT;

/// Analysis: run the classifier over every article still pending. `Ignore`
/// verdicts flip the status without persisting a payload; anything else is
/// stored with its company rows. One bad article never aborts the batch.
/// Returns (articles classified, failures); ignored articles count as
/// classified.
pub async fn run(
    store: &dyn PipelineStore,
    classifier: &dyn ArticleClassifier,
    status: &StatusTracker,
    run_id: i64,
) -> Result<(u32, u32), PipelineError> {
    status.set_stage(Stage::Analysis);
    let cancel = status.cancel_flag();

    let articles = store.pending_analysis(BATCH_LIMIT).await?;
    let total = articles.len() as u32;
    status.update_progress(0, total);

    let mut analyzed = 0u32;
    let mut failed = 0u32;

    for (done, article) in articles.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        match classifier.classify(article).await {
            Ok(analysis) if analysis.mode == AnalysisMode::Ignore => {
                debug!(article_id = %article.id, "article not relevant, skipping");
                store.mark_analysis(article.id, ItemStatus::Success).await?;
                analyzed += 1;
            }
            Ok(analysis) => {
                store.record_analysis(article.id, &analysis).await?;
                store
                    .bump_counter(run_id, RunCounter::EntitiesAnalyzed, 1)
                    .await?;
                analyzed += 1;
                debug!(
                    article_id = %article.id,
                    mode = analysis.mode.as_str(),
                    companies = analysis.company_sentiments.len(),
                    "article analyzed"
                );
            }
            Err(e) => {
                warn!(article_id = %article.id, error = %e, "analysis failed");
                store.mark_analysis(article.id, ItemStatus::Failed).await?;
                failed += 1;
            }
        }

        status.update_progress(done as u32 + 1, total);
    }

    Ok((analyzed, failed))
}
