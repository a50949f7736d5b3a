// Test doubles for the pipeline.
//
// Four mocks matching the four trait boundaries:
// - MemoryStore (PipelineStore) — stateful in-memory tables
// - MockSource (NewsSource) — registered links and pages, builder-style
// - FixedEmbedder (EmbeddingProvider) — deterministic hash-based vectors
// - MockClassifier (ArticleClassifier) — substring-matched verdicts
//
// Plus helpers for building ArticleContent and ArticleAnalysis values.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tradesignal_common::{
    hash_url, AnalysisMode, ArticleAnalysis, ArticleContent, CompanySentiment, ItemStatus, Link,
    LinkStatus, NewArticle, PendingArticle, PipelineRun, RiskType, RunCounter, RunState, Sentiment,
};
use uuid::Uuid;

use crate::status::CancelFlag;
use crate::traits::{ArticleClassifier, EmbeddingProvider, NewsSource, PipelineStore};

/// Standard embedding dimension for test vectors.
pub const TEST_EMBEDDING_DIM: usize = 8;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct StoredArticle {
    id: Uuid,
    link_id: String,
    source: String,
    url: String,
    content: ArticleContent,
    embedding_status: ItemStatus,
    analysis_status: ItemStatus,
}

#[derive(Default)]
struct MemoryStoreInner {
    links: BTreeMap<String, Link>,
    link_order: Vec<String>,
    articles: Vec<StoredArticle>,
    embeddings: Vec<(Uuid, Vec<f32>, String)>,
    analyses: Vec<(Uuid, ArticleAnalysis)>,
    runs: BTreeMap<i64, PipelineRun>,
    next_run_id: i64,
    fail_scrape_candidates: bool,
}

/// Stateful in-memory store. Thread-safe via interior Mutex; mirrors the
/// guarded status-flip semantics of the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `scrape_candidates` return an error, to exercise stage failure.
    pub fn failing_scrape_candidates(self) -> Self {
        self.lock().fail_scrape_candidates = true;
        self
    }

    // --- Assertion helpers ---

    pub fn link_count(&self) -> usize {
        self.lock().links.len()
    }

    pub fn link_status(&self, url: &str) -> Option<LinkStatus> {
        self.lock().links.get(&hash_url(url)).map(|l| l.status)
    }

    pub fn article_count(&self) -> usize {
        self.lock().articles.len()
    }

    pub fn article_id_for_url(&self, url: &str) -> Option<Uuid> {
        self.lock()
            .articles
            .iter()
            .find(|a| a.url == url)
            .map(|a| a.id)
    }

    pub fn has_article_for_link(&self, url: &str) -> bool {
        let link_id = hash_url(url);
        self.lock().articles.iter().any(|a| a.link_id == link_id)
    }

    pub fn article_statuses(&self, url: &str) -> Option<(ItemStatus, ItemStatus)> {
        self.lock()
            .articles
            .iter()
            .find(|a| a.url == url)
            .map(|a| (a.embedding_status, a.analysis_status))
    }

    pub fn embedding_count(&self) -> usize {
        self.lock().embeddings.len()
    }

    pub fn embedding_model_for(&self, article_id: Uuid) -> Option<String> {
        self.lock()
            .embeddings
            .iter()
            .find(|(id, _, _)| *id == article_id)
            .map(|(_, _, model)| model.clone())
    }

    pub fn analysis_for(&self, article_id: Uuid) -> Option<ArticleAnalysis> {
        self.lock()
            .analyses
            .iter()
            .find(|(id, _)| *id == article_id)
            .map(|(_, a)| a.clone())
    }

    pub fn analysis_count(&self) -> usize {
        self.lock().analyses.len()
    }

    pub fn run(&self, run_id: i64) -> Option<PipelineRun> {
        self.lock().runs.get(&run_id).cloned()
    }

    pub fn run_count(&self) -> usize {
        self.lock().runs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn insert_links(&self, source: &str, urls: &[String]) -> Result<u32> {
        let mut inner = self.lock();
        let mut inserted = 0u32;
        for url in urls {
            let id = hash_url(url);
            if inner.links.contains_key(&id) {
                continue;
            }
            inner.links.insert(
                id.clone(),
                Link {
                    id: id.clone(),
                    url: url.clone(),
                    source: source.to_string(),
                    status: LinkStatus::New,
                    discovered_at: Utc::now(),
                },
            );
            inner.link_order.push(id);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn scrape_candidates(&self, sources: Option<&[String]>, limit: u32) -> Result<Vec<Link>> {
        let inner = self.lock();
        if inner.fail_scrape_candidates {
            bail!("MemoryStore: scrape_candidates forced failure");
        }
        Ok(inner
            .link_order
            .iter()
            .filter_map(|id| inner.links.get(id))
            .filter(|l| !l.status.is_terminal())
            .filter(|l| sources.map_or(true, |s| s.iter().any(|n| n.as_str() == l.source)))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_link(&self, link_id: &str, status: LinkStatus) -> Result<()> {
        let mut inner = self.lock();
        if let Some(link) = inner.links.get_mut(link_id) {
            if !link.status.is_terminal() {
                link.status = status;
            }
        }
        Ok(())
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.lock().articles.push(StoredArticle {
            id,
            link_id: article.link_id.clone(),
            source: article.source.clone(),
            url: article.url.clone(),
            content: article.content.clone(),
            embedding_status: ItemStatus::Pending,
            analysis_status: ItemStatus::Pending,
        });
        Ok(id)
    }

    async fn pending_embeddings(&self, limit: u32) -> Result<Vec<PendingArticle>> {
        let inner = self.lock();
        Ok(inner
            .articles
            .iter()
            .filter(|a| {
                a.embedding_status == ItemStatus::Pending && !a.content.cleaned_text.is_empty()
            })
            .take(limit as usize)
            .map(to_pending)
            .collect())
    }

    async fn record_embedding(
        &self,
        article: &PendingArticle,
        embedding: Vec<f32>,
        model: &str,
    ) -> Result<()> {
        let article_id = article.id;
        let mut inner = self.lock();
        inner.embeddings.push((article_id, embedding, model.to_string()));
        if let Some(article) = inner.articles.iter_mut().find(|a| a.id == article_id) {
            if article.embedding_status == ItemStatus::Pending {
                article.embedding_status = ItemStatus::Success;
            }
        }
        Ok(())
    }

    async fn mark_embedding(&self, article_id: Uuid, status: ItemStatus) -> Result<()> {
        let mut inner = self.lock();
        if let Some(article) = inner.articles.iter_mut().find(|a| a.id == article_id) {
            if article.embedding_status == ItemStatus::Pending {
                article.embedding_status = status;
            }
        }
        Ok(())
    }

    async fn pending_analysis(&self, limit: u32) -> Result<Vec<PendingArticle>> {
        let inner = self.lock();
        Ok(inner
            .articles
            .iter()
            .filter(|a| {
                a.analysis_status == ItemStatus::Pending && !a.content.cleaned_text.is_empty()
            })
            .take(limit as usize)
            .map(to_pending)
            .collect())
    }

    async fn record_analysis(&self, article_id: Uuid, analysis: &ArticleAnalysis) -> Result<()> {
        let mut inner = self.lock();
        inner.analyses.retain(|(id, _)| *id != article_id);
        inner.analyses.push((article_id, analysis.clone()));
        if let Some(article) = inner.articles.iter_mut().find(|a| a.id == article_id) {
            if article.analysis_status == ItemStatus::Pending {
                article.analysis_status = ItemStatus::Success;
            }
        }
        Ok(())
    }

    async fn mark_analysis(&self, article_id: Uuid, status: ItemStatus) -> Result<()> {
        let mut inner = self.lock();
        if let Some(article) = inner.articles.iter_mut().find(|a| a.id == article_id) {
            if article.analysis_status == ItemStatus::Pending {
                article.analysis_status = status;
            }
        }
        Ok(())
    }

    async fn create_run(&self) -> Result<i64> {
        let mut inner = self.lock();
        inner.next_run_id += 1;
        let id = inner.next_run_id;
        inner.runs.insert(
            id,
            PipelineRun {
                id,
                start_time: Utc::now(),
                end_time: None,
                status: RunState::Running,
                new_links_found: 0,
                articles_scraped: 0,
                articles_embedded: 0,
                entities_analyzed: 0,
                scraper_stats: None,
                details: None,
            },
        );
        Ok(id)
    }

    async fn bump_counter(&self, run_id: i64, counter: RunCounter, by: i32) -> Result<()> {
        let mut inner = self.lock();
        let run = inner
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| anyhow!("MemoryStore: no run {run_id}"))?;
        match counter {
            RunCounter::NewLinksFound => run.new_links_found += by,
            RunCounter::ArticlesScraped => run.articles_scraped += by,
            RunCounter::ArticlesEmbedded => run.articles_embedded += by,
            RunCounter::EntitiesAnalyzed => run.entities_analyzed += by,
        }
        Ok(())
    }

    async fn set_scraper_stats(&self, run_id: i64, stats: serde_json::Value) -> Result<()> {
        let mut inner = self.lock();
        if let Some(run) = inner.runs.get_mut(&run_id) {
            run.scraper_stats = Some(stats);
        }
        Ok(())
    }

    async fn finalize_run(
        &self,
        run_id: i64,
        status: RunState,
        details: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.lock();
        if let Some(run) = inner.runs.get_mut(&run_id) {
            if run.status == RunState::Running {
                run.status = status;
                run.details = details.map(|d| d.to_string());
                run.end_time = Some(Utc::now());
            }
        }
        Ok(())
    }
}

fn to_pending(article: &StoredArticle) -> PendingArticle {
    PendingArticle {
        id: article.id,
        source: article.source.clone(),
        publication_date: article.content.publication_date,
        cleaned_text: article.content.cleaned_text.clone(),
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Registered links-and-pages news source. Builder pattern: `.with_links()`,
/// `.on_page()`. Fetching an unregistered URL returns `Err`.
pub struct MockSource {
    name: String,
    links: Vec<String>,
    pages: HashMap<String, ArticleContent>,
    discover_error: Option<String>,
    /// Cancel flag set when this URL is fetched, to exercise stop-mid-stage.
    cancel_on_fetch: Option<(String, CancelFlag)>,
    /// Discovery blocks on this gate until notified, to hold a run open.
    discovery_gate: Option<Arc<Notify>>,
}

impl MockSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            links: Vec::new(),
            pages: HashMap::new(),
            discover_error: None,
            cancel_on_fetch: None,
            discovery_gate: None,
        }
    }

    pub fn with_links(mut self, urls: &[&str]) -> Self {
        self.links = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn on_page(mut self, url: &str, content: ArticleContent) -> Self {
        self.pages.insert(url.to_string(), content);
        self
    }

    /// Make `discover_links` fail for this source.
    pub fn failing_discovery(mut self, message: &str) -> Self {
        self.discover_error = Some(message.to_string());
        self
    }

    /// Trip the cancel flag while fetching `url`, after which the in-flight
    /// fetch still succeeds.
    pub fn cancel_on_fetch(mut self, url: &str, flag: CancelFlag) -> Self {
        self.cancel_on_fetch = Some((url.to_string(), flag));
        self
    }

    /// Park `discover_links` until the gate is notified.
    pub fn gated_discovery(mut self, gate: Arc<Notify>) -> Self {
        self.discovery_gate = Some(gate);
        self
    }
}

#[async_trait]
impl NewsSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn discover_links(&self) -> Result<Vec<String>> {
        if let Some(gate) = &self.discovery_gate {
            gate.notified().await;
        }
        if let Some(message) = &self.discover_error {
            bail!("MockSource: {message}");
        }
        Ok(self.links.clone())
    }

    async fn fetch_article(&self, url: &str) -> Result<ArticleContent> {
        if let Some((trigger, flag)) = &self.cancel_on_fetch {
            if trigger == url {
                flag.request();
            }
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockSource: no page registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// FixedEmbedder
// ---------------------------------------------------------------------------

/// Deterministic embedder. Each text maps to a unique hash-based unit vector;
/// texts containing a registered failure substring return `Err`.
pub struct FixedEmbedder {
    dimension: usize,
    fail_contains: Vec<String>,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_contains: Vec::new(),
        }
    }

    pub fn failing_for(mut self, substring: &str) -> Self {
        self.fail_contains.push(substring.to_string());
        self
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut vec = vec![0.0f32; self.dimension];
        for v in vec.iter_mut() {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *v = ((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0;
        }
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn model(&self) -> &str {
        "test-embedding"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        for substring in &self.fail_contains {
            if text.contains(substring.as_str()) {
                bail!("FixedEmbedder: forced failure for text containing {substring:?}");
            }
        }
        Ok(self.hash_vector(text))
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Substring-matched classifier. First matching rule wins; unmatched texts
/// fall back to the default verdict, or `Err` if none is set.
pub struct MockClassifier {
    rules: Vec<(String, ArticleAnalysis)>,
    fail_contains: Vec<String>,
    default_verdict: Option<ArticleAnalysis>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fail_contains: Vec::new(),
            default_verdict: None,
        }
    }

    pub fn on_text(mut self, substring: &str, analysis: ArticleAnalysis) -> Self {
        self.rules.push((substring.to_string(), analysis));
        self
    }

    pub fn failing_for(mut self, substring: &str) -> Self {
        self.fail_contains.push(substring.to_string());
        self
    }

    pub fn with_default(mut self, analysis: ArticleAnalysis) -> Self {
        self.default_verdict = Some(analysis);
        self
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleClassifier for MockClassifier {
    async fn classify(&self, article: &PendingArticle) -> Result<ArticleAnalysis> {
        for substring in &self.fail_contains {
            if article.cleaned_text.contains(substring.as_str()) {
                bail!("MockClassifier: forced failure for text containing {substring:?}");
            }
        }
        for (substring, analysis) in &self.rules {
            if article.cleaned_text.contains(substring.as_str()) {
                return Ok(analysis.clone());
            }
        }
        self.default_verdict
            .clone()
            .ok_or_else(|| anyhow!("MockClassifier: no verdict for article {}", article.id))
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

pub fn article(title: &str, body: &str) -> ArticleContent {
    ArticleContent {
        title: title.to_string(),
        author: None,
        publication_date: Some(Utc::now()),
        raw_text: body.to_string(),
        cleaned_text: body.to_string(),
    }
}

pub fn ignore_verdict() -> ArticleAnalysis {
    ArticleAnalysis {
        mode: AnalysisMode::Ignore,
        countries: Vec::new(),
        commodities: Vec::new(),
        contract_value: None,
        deadline: None,
        company_sentiments: Vec::new(),
    }
}

pub fn tender_verdict(contract_value: &str, deadline: &str, winner: &str) -> ArticleAnalysis {
    ArticleAnalysis {
        mode: AnalysisMode::Tender,
        countries: Vec::new(),
        commodities: Vec::new(),
        contract_value: Some(contract_value.to_string()),
        deadline: Some(deadline.to_string()),
        company_sentiments: vec![CompanySentiment {
            company_name: winner.to_string(),
            sentiment: Sentiment::Positive,
            risk_type: None,
            reason_for_sentiment: "Won the tender.".to_string(),
        }],
    }
}

pub fn sentiment_verdict(
    company: &str,
    sentiment: Sentiment,
    risk_type: Option<RiskType>,
) -> ArticleAnalysis {
    ArticleAnalysis {
        mode: AnalysisMode::Sentiment,
        countries: Vec::new(),
        commodities: Vec::new(),
        contract_value: None,
        deadline: None,
        company_sentiments: vec![CompanySentiment {
            company_name: company.to_string(),
            sentiment,
            risk_type,
            reason_for_sentiment: "Test verdict.".to_string(),
        }],
    }
}
