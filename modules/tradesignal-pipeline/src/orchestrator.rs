use std::sync::Arc;

use tradesignal_common::{PipelineError, RunState, Stage};
use tracing::{error, info};

use crate::registry::SourceRegistry;
use crate::stages;
use crate::status::{PipelineStatus, StatusTracker};
use crate::traits::{ArticleClassifier, EmbeddingProvider, NewsSource, PipelineStore};

/// The pipeline orchestrator. At most one run executes at a time; `start_*`
/// takes the single-flight lock, opens a run record, and executes the stage
/// sequence on a background task. Every accepted start produces exactly one
/// finalized run record, whatever happens in between.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn PipelineStore>,
    registry: Arc<SourceRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    classifier: Arc<dyn ArticleClassifier>,
    status: Arc<StatusTracker>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        registry: Arc<SourceRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
        classifier: Arc<dyn ArticleClassifier>,
    ) -> Self {
        Self {
            store,
            registry,
            embedder,
            classifier,
            status: Arc::new(StatusTracker::new()),
        }
    }

    /// Start a full run: discovery, scraping, embedding, analysis in order.
    /// An optional source filter restricts discovery and scraping to the named
    /// sources. Returns the new run id; the stages execute in the background.
    pub async fn start_full(&self, sources: Option<Vec<String>>) -> Result<i64, PipelineError> {
        self.start(Stage::ALL.to_vec(), sources).await
    }

    /// Start a run covering a single stage.
    pub async fn start_stage(
        &self,
        stage: Stage,
        sources: Option<Vec<String>>,
    ) -> Result<i64, PipelineError> {
        self.start(vec![stage], sources).await
    }

    /// Ask the running pipeline to stop. The in-flight item finishes, the run
    /// record closes as STOPPED.
    pub fn stop(&self) -> Result<(), PipelineError> {
        self.status.request_cancel()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.registry.names()
    }

    async fn start(
        &self,
        plan: Vec<Stage>,
        sources: Option<Vec<String>>,
    ) -> Result<i64, PipelineError> {
        // A filter naming an unregistered source is a caller error, caught
        // before the lock is taken.
        if let Some(names) = &sources {
            for name in names {
                self.registry.get(name)?;
            }
        }

        self.status.acquire()?;

        let run_id = match self.store.create_run().await {
            Ok(id) => id,
            Err(e) => {
                self.status.release();
                return Err(e.into());
            }
        };
        self.status.attach_run(run_id);

        info!(run_id, stages = ?plan, "pipeline run started");

        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.execute(run_id, plan, sources).await;
        });

        Ok(run_id)
    }

    async fn execute(&self, run_id: i64, plan: Vec<Stage>, sources: Option<Vec<String>>) {
        let outcome = self.run_stages(run_id, &plan, sources.as_deref()).await;

        let (state, details) = match &outcome {
            Ok(summary) => (RunState::Completed, Some(summary.clone())),
            Err(PipelineError::Cancelled) => {
                (RunState::Stopped, Some("stopped by request".to_string()))
            }
            Err(e) => (RunState::Failed, Some(e.to_string())),
        };

        if let Err(e) = self
            .store
            .finalize_run(run_id, state, details.as_deref())
            .await
        {
            error!(run_id, error = %e, "failed to finalize run record");
        }

        match &details {
            Some(d) if state == RunState::Failed => self.status.set_message(format!("Failed: {d}")),
            _ => self.status.set_message(state.as_str()),
        }
        self.status.release();

        info!(run_id, status = state.as_str(), "pipeline run finished");
    }

    /// Runs the planned stages in order and returns a per-stage summary of
    /// processed and failed item counts. The summary lands on the run record
    /// when the run completes.
    async fn run_stages(
        &self,
        run_id: i64,
        plan: &[Stage],
        sources: Option<&[String]>,
    ) -> Result<String, PipelineError> {
        let mut summary = Vec::with_capacity(plan.len());

        for stage in plan {
            let (processed, failed) = match stage {
                Stage::LinkDiscovery => {
                    stages::discover::run(
                        self.store.as_ref(),
                        &self.registry,
                        sources,
                        &self.status,
                        run_id,
                    )
                    .await?
                }
                Stage::ArticleScrape => {
                    stages::scrape::run(
                        self.store.as_ref(),
                        &self.registry,
                        sources,
                        &self.status,
                        run_id,
                    )
                    .await?
                }
                Stage::Embedding => {
                    stages::embed::run(
                        self.store.as_ref(),
                        self.embedder.as_ref(),
                        &self.status,
                        run_id,
                    )
                    .await?
                }
                Stage::Analysis => {
                    stages::analyze::run(
                        self.store.as_ref(),
                        self.classifier.as_ref(),
                        &self.status,
                        run_id,
                    )
                    .await?
                }
            };

            let name = stage.display_name();
            self.status
                .set_message(format!("{name} complete. Processed: {processed}, Failed: {failed}"));
            summary.push(format!("{name}: processed {processed}, failed {failed}"));
        }

        Ok(summary.join("; "))
    }
}

/// Builder-style constructor used by the server binary.
pub struct PipelineBuilder {
    store: Arc<dyn PipelineStore>,
    registry: SourceRegistry,
    embedder: Arc<dyn EmbeddingProvider>,
    classifier: Arc<dyn ArticleClassifier>,
}

impl PipelineBuilder {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        classifier: Arc<dyn ArticleClassifier>,
    ) -> Self {
        Self {
            store,
            registry: SourceRegistry::new(),
            embedder,
            classifier,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.registry = self.registry.register(source);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline::new(
            self.store,
            Arc::new(self.registry),
            self.embedder,
            self.classifier,
        )
    }
}
