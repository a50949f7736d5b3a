use serde_json::json;
use tradesignal_common::{PipelineError, RunCounter, Stage};
use tracing::{info, warn};

use crate::registry::SourceRegistry;
use crate::status::StatusTracker;
use crate::traits::PipelineStore;

/// Link discovery: ask every registered source (or just the filtered ones)
/// for its current article URLs and upsert them. One failing source is logged
/// and skipped; the rest still run. Per-source outcomes land on the run
/// record as scraper stats. Returns (new links inserted, sources that
/// failed).
pub async fn run(
    store: &dyn PipelineStore,
    registry: &SourceRegistry,
    sources: Option<&[String]>,
    status: &StatusTracker,
    run_id: i64,
) -> Result<(u32, u32), PipelineError> {
    status.set_stage(Stage::LinkDiscovery);
    let cancel = status.cancel_flag();

    let selected: Vec<_> = registry
        .iter()
        .filter(|(name, _)| sources.map_or(true, |s| s.iter().any(|n| n.as_str() == *name)))
        .collect();

    let total = selected.len() as u32;
    status.update_progress(0, total);

    let mut stats = serde_json::Map::new();
    let mut cancelled = false;
    let mut new_links = 0u32;
    let mut failed_sources = 0u32;

    for (done, (name, source)) in selected.into_iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        match source.discover_links().await {
            Ok(urls) => {
                let inserted = store.insert_links(name, &urls).await?;
                store
                    .bump_counter(run_id, RunCounter::NewLinksFound, inserted as i32)
                    .await?;
                status.record_source_count(name, inserted);
                stats.insert(
                    name.to_string(),
                    json!({ "urls_found": urls.len(), "new_links": inserted }),
                );
                new_links += inserted;
                info!(source = name, urls = urls.len(), new_links = inserted, "discovered links");
            }
            Err(e) => {
                warn!(source = name, error = %e, "link discovery failed, skipping source");
                status.record_source_count(name, 0);
                stats.insert(name.to_string(), json!({ "error": e.to_string() }));
                failed_sources += 1;
            }
        }

        status.update_progress(done as u32 + 1, total);
    }

    store
        .set_scraper_stats(run_id, serde_json::Value::Object(stats))
        .await?;

    if cancelled {
        return Err(PipelineError::Cancelled);
    }
    Ok((new_links, failed_sources))
}
