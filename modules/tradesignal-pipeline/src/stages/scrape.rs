use tradesignal_common::{LinkStatus, NewArticle, PipelineError, RunCounter, Stage};
use tracing::{debug, warn};

use crate::registry::SourceRegistry;
use crate::status::StatusTracker;
use crate::traits::PipelineStore;

use super::BATCH_LIMIT;

/// Article scraping: fetch every non-terminal link through its source module.
/// A source filter restricts the batch to links from the named sources. Each
/// processed link resolves to exactly one terminal status — `success` with a
/// stored article, or `failed`. A failing link never aborts the batch.
/// Returns (articles stored, links marked failed).
pub async fn run(
    store: &dyn PipelineStore,
    registry: &SourceRegistry,
    sources: Option<&[String]>,
    status: &StatusTracker,
    run_id: i64,
) -> Result<(u32, u32), PipelineError> {
    status.set_stage(Stage::ArticleScrape);
    let cancel = status.cancel_flag();

    let links = store.scrape_candidates(sources, BATCH_LIMIT).await?;
    let total = links.len() as u32;
    status.update_progress(0, total);

    let mut scraped = 0u32;
    let mut failed = 0u32;

    for (done, link) in links.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let source = match registry.get(&link.source) {
            Ok(source) => source,
            Err(e) => {
                // Link rows can outlive a deregistered source module.
                warn!(url = %link.url, error = %e, "no source module for link, marking failed");
                store.mark_link(&link.id, LinkStatus::Failed).await?;
                failed += 1;
                status.update_progress(done as u32 + 1, total);
                continue;
            }
        };

        match source.fetch_article(&link.url).await {
            Ok(content) => {
                let article = NewArticle {
                    link_id: link.id.clone(),
                    source: link.source.clone(),
                    url: link.url.clone(),
                    content,
                };
                store.insert_article(&article).await?;
                store.mark_link(&link.id, LinkStatus::Success).await?;
                store
                    .bump_counter(run_id, RunCounter::ArticlesScraped, 1)
                    .await?;
                scraped += 1;
                debug!(url = %link.url, "article scraped");
            }
            Err(e) => {
                warn!(url = %link.url, error = %e, "article scrape failed");
                store.mark_link(&link.id, LinkStatus::Failed).await?;
                failed += 1;
            }
        }

        status.update_progress(done as u32 + 1, total);
    }

    Ok((scraped, failed))
}
