// LLM-backed article classifier.
//
// The wire types below define the structured output contract sent to the
// model; doc comments become field descriptions in the JSON schema, which is
// most of the prompt engineering.

use ai_client::OpenAi;
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tradesignal_common::{
    AnalysisMode, ArticleAnalysis, CompanySentiment, PendingArticle, RiskType, Sentiment,
};
use tracing::debug;

use crate::traits::ArticleClassifier;

/// Max article characters sent to the model per request.
const MAX_CLASSIFY_CHARS: usize = 30_000;

const SYSTEM_PROMPT: &str = r#"You are an expert AI analyst for a global supply chain team. Your task is to meticulously analyze a news article and extract structured data.

Your process must be:
1. Classify the `mode`: First, determine if the article is about a 'Tender' (contracts, bids, deals), general business 'Sentiment' (earnings, disruptions, partnerships, competition), or 'Ignore' (irrelevant).

2. Perform conditional extraction based on the `mode`:
   - If `mode` is 'Sentiment': Your primary goal is to populate the `company_sentiments` list. Identify every company mentioned. For each one, create an object with its name, the sentiment (Positive, Negative, Neutral) towards it in this context, and a concise reason.
   - If `mode` is 'Tender': Your primary goal is to extract `contract_value` and `deadline`. You should also identify the key companies involved in the tender (e.g., the buyer, the winner) and list them in `company_sentiments` with appropriate sentiment (e.g., Positive for the winner).

3. Always extract general info: Regardless of the mode, always try to extract the `countries` and `commodities` involved."#;

/// Sentiment and risk analysis for a single company mentioned in an article.
#[derive(Debug, Deserialize, JsonSchema)]
struct WireCompanySentiment {
    /// The specific name of the company being analyzed.
    company_name: String,
    /// The sentiment towards this specific company based on the article's context.
    sentiment: Sentiment,
    /// If sentiment is Negative, classify the type of supply chain risk.
    /// 'Trade Barrier' (tariffs, sanctions), 'Supply Disruption' (factory
    /// fire, flood, strike), 'Compliance' (investigation, fraud), 'Financial'
    /// (bankruptcy, debt), or 'Reputational' (scandal, poor quality).
    risk_type: Option<RiskType>,
    /// A brief, one-sentence justification for the sentiment and risk
    /// assigned to this company.
    reason_for_sentiment: String,
}

/// Overall structured analysis of a news article for supply chain and
/// procurement intelligence.
#[derive(Debug, Deserialize, JsonSchema)]
struct WireAnalysis {
    /// The article's primary theme: a 'Tender'/'Contract' announcement,
    /// general business 'Sentiment' news, or 'Ignore' if irrelevant.
    mode: AnalysisMode,
    /// Sentiment analyses for each individual company mentioned in the
    /// article. The focus when the mode is 'Sentiment'.
    company_sentiments: Option<Vec<WireCompanySentiment>>,
    /// Countries or regions directly impacted or involved.
    countries: Option<Vec<String>>,
    /// Specific commodities or industrial sectors involved (e.g. 'Lithium',
    /// 'Semiconductors', 'Renewable Energy').
    commodities: Option<Vec<String>>,
    /// The total monetary value of the contract or tender. ONLY when the
    /// mode is 'Tender'.
    contract_value: Option<String>,
    /// The deadline for bids or the project end date. ONLY when the mode is
    /// 'Tender'.
    deadline: Option<String>,
}

impl From<WireAnalysis> for ArticleAnalysis {
    fn from(wire: WireAnalysis) -> Self {
        ArticleAnalysis {
            mode: wire.mode,
            countries: wire.countries.unwrap_or_default(),
            commodities: wire.commodities.unwrap_or_default(),
            contract_value: wire.contract_value,
            deadline: wire.deadline,
            company_sentiments: wire
                .company_sentiments
                .unwrap_or_default()
                .into_iter()
                .map(|c| CompanySentiment {
                    company_name: c.company_name,
                    sentiment: c.sentiment,
                    risk_type: c.risk_type,
                    reason_for_sentiment: c.reason_for_sentiment,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ArticleClassifier for OpenAi {
    async fn classify(&self, article: &PendingArticle) -> Result<ArticleAnalysis> {
        let text = truncate_chars(&article.cleaned_text, MAX_CLASSIFY_CHARS);

        debug!(article_id = %article.id, chars = text.len(), "classifying article");

        let wire: WireAnalysis = self.extract(self.model(), SYSTEM_PROMPT, text).await?;
        Ok(wire.into())
    }
}

/// Truncate to at most `max` chars without splitting a UTF-8 character.
fn truncate_chars(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
