use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// One phase of the ETL pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    LinkDiscovery,
    ArticleScrape,
    Embedding,
    Analysis,
}

impl Stage {
    /// Full-pipeline execution order.
    pub const ALL: [Stage; 4] = [
        Stage::LinkDiscovery,
        Stage::ArticleScrape,
        Stage::Embedding,
        Stage::Analysis,
    ];

    /// Human-readable stage name shown in status polling.
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::LinkDiscovery => "Finding Links",
            Stage::ArticleScrape => "Scraping Articles",
            Stage::Embedding => "Generating Embeddings",
            Stage::Analysis => "Analyzing Articles",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Stage::LinkDiscovery => "link-discovery",
            Stage::ArticleScrape => "article-scrape",
            Stage::Embedding => "embedding",
            Stage::Analysis => "analysis",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link-discovery" => Ok(Stage::LinkDiscovery),
            "article-scrape" => Ok(Stage::ArticleScrape),
            "embedding" => Ok(Stage::Embedding),
            "analysis" => Ok(Stage::Analysis),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Lifecycle of a discovered article URL.
///
/// `New` → (`Pending`) → `Success` | `Failed`. Terminal statuses never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    New,
    Pending,
    Success,
    Failed,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::New => "new",
            LinkStatus::Pending => "pending",
            LinkStatus::Success => "success",
            LinkStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(LinkStatus::New),
            "pending" => Some(LinkStatus::Pending),
            "success" => Some(LinkStatus::Success),
            "failed" => Some(LinkStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses are never overwritten.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkStatus::Success | LinkStatus::Failed)
    }
}

/// A discovered article URL. `id` is the SHA-256 hex of the URL, which makes
/// re-discovery of the same URL a no-op upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub url: String,
    pub source: String,
    pub status: LinkStatus,
    pub discovered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

/// Per-article worker status, one independent state machine per concern
/// (embedding, analysis). `Pending` → `Success` | `Failed`, flipped once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Success,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Success => "success",
            ItemStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ItemStatus::Pending),
            "success" => Some(ItemStatus::Success),
            "failed" => Some(ItemStatus::Failed),
            _ => None,
        }
    }
}

/// What a source module returns for one fetched article page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleContent {
    pub title: String,
    pub author: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub raw_text: String,
    pub cleaned_text: String,
}

/// A stored article to insert after a successful fetch. Both worker statuses
/// start `pending`.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub link_id: String,
    pub source: String,
    pub url: String,
    pub content: ArticleContent,
}

/// Candidate row for the embedding and analysis workers: just the fields the
/// provider call and the embedding row need.
#[derive(Debug, Clone)]
pub struct PendingArticle {
    pub id: Uuid,
    pub source: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub cleaned_text: String,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Primary theme of an article, decided first by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AnalysisMode {
    Tender,
    Sentiment,
    Ignore,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Tender => "Tender",
            AnalysisMode::Sentiment => "Sentiment",
            AnalysisMode::Ignore => "Ignore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(Sentiment::Positive),
            "Negative" => Some(Sentiment::Negative),
            "Neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

/// Supply-chain risk classification, set when sentiment is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RiskType {
    #[serde(rename = "Trade Barrier")]
    TradeBarrier,
    #[serde(rename = "Supply Disruption")]
    SupplyDisruption,
    Compliance,
    Financial,
    Reputational,
}

impl RiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskType::TradeBarrier => "Trade Barrier",
            RiskType::SupplyDisruption => "Supply Disruption",
            RiskType::Compliance => "Compliance",
            RiskType::Financial => "Financial",
            RiskType::Reputational => "Reputational",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Trade Barrier" => Some(RiskType::TradeBarrier),
            "Supply Disruption" => Some(RiskType::SupplyDisruption),
            "Compliance" => Some(RiskType::Compliance),
            "Financial" => Some(RiskType::Financial),
            "Reputational" => Some(RiskType::Reputational),
            _ => None,
        }
    }
}

/// Sentiment and risk read for one company mentioned in an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySentiment {
    pub company_name: String,
    pub sentiment: Sentiment,
    pub risk_type: Option<RiskType>,
    pub reason_for_sentiment: String,
}

/// Structured intelligence extracted from one article. `Ignore` mode carries
/// no payload and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub mode: AnalysisMode,
    pub countries: Vec<String>,
    pub commodities: Vec<String>,
    pub contract_value: Option<String>,
    pub deadline: Option<String>,
    pub company_sentiments: Vec<CompanySentiment>,
}

// ---------------------------------------------------------------------------
// Pipeline runs
// ---------------------------------------------------------------------------

/// Terminal state machine of a run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "RUNNING",
            RunState::Completed => "COMPLETED",
            RunState::Failed => "FAILED",
            RunState::Stopped => "STOPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(RunState::Running),
            "COMPLETED" => Some(RunState::Completed),
            "FAILED" => Some(RunState::Failed),
            "STOPPED" => Some(RunState::Stopped),
            _ => None,
        }
    }
}

/// Counter columns on the run record, bumped atomically per processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCounter {
    NewLinksFound,
    ArticlesScraped,
    ArticlesEmbedded,
    EntitiesAnalyzed,
}

impl RunCounter {
    /// Column name on `pipeline_runs`. Static strings only — these are
    /// interpolated into SQL.
    pub fn column(&self) -> &'static str {
        match self {
            RunCounter::NewLinksFound => "new_links_found",
            RunCounter::ArticlesScraped => "articles_scraped",
            RunCounter::ArticlesEmbedded => "articles_embedded",
            RunCounter::EntitiesAnalyzed => "entities_analyzed",
        }
    }
}

/// Durable audit record of one orchestrated execution (full or single-stage).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunState,
    pub new_links_found: i32,
    pub articles_scraped: i32,
    pub articles_embedded: i32,
    pub entities_analyzed: i32,
    pub scraper_stats: Option<serde_json::Value>,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_slug_round_trips() {
        for stage in Stage::ALL {
            assert_eq!(stage.slug().parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn link_status_round_trips() {
        for s in ["new", "pending", "success", "failed"] {
            assert_eq!(LinkStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(LinkStatus::parse("done").is_none());
    }

    #[test]
    fn risk_type_serde_uses_spaced_names() {
        let json = serde_json::to_string(&RiskType::SupplyDisruption).unwrap();
        assert_eq!(json, "\"Supply Disruption\"");
        let back: RiskType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RiskType::SupplyDisruption);
    }

    #[test]
    fn terminal_statuses() {
        assert!(LinkStatus::Success.is_terminal());
        assert!(LinkStatus::Failed.is_terminal());
        assert!(!LinkStatus::New.is_terminal());
        assert!(!LinkStatus::Pending.is_terminal());
    }
}
