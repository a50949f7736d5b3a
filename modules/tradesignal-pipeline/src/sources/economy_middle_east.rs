// Source module for economymiddleeast.com.
//
// Discovery walks the business category pages and collects every anchor
// pointing at a `/news/` URL. Article pages carry their date in an
// `article:modified_time` meta tag, the author in JSON-LD (with a meta-tag
// fallback), and the body under `div.brxe-post-content`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use tradesignal_common::{clean_article_text, ArticleContent};
use url::Url;

use crate::traits::NewsSource;

pub const SOURCE_NAME: &str = "economymiddleeast.com";

const CATEGORY_URLS: &[&str] = &[
    "https://economymiddleeast.com/newscategories/banking-finance/",
    "https://economymiddleeast.com/newscategories/real-estate/",
    "https://economymiddleeast.com/newscategories/industry/",
    "https://economymiddleeast.com/newscategories/economy/",
    "https://economymiddleeast.com/newscategories/markets/",
    "https://economymiddleeast.com/newscategories/technology-innovation/",
    "https://economymiddleeast.com/newscategories/logistics/",
    "https://economymiddleeast.com/newscategories/sustainability/",
];

const USER_AGENT: &str = "Mozilla/5.0";

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static MODIFIED_TIME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="article:modified_time"]"#).expect("valid selector")
});
static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});
static META_AUTHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="author"]"#).expect("valid selector"));
static POST_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.brxe-post-content p").expect("valid selector"));

pub struct EconomyMiddleEast {
    http: reqwest::Client,
    category_urls: Vec<String>,
}

impl EconomyMiddleEast {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            category_urls: CATEGORY_URLS.iter().map(|u| u.to_string()).collect(),
        }
    }

    /// Override the category pages, for tests against a local server.
    pub fn with_category_urls(mut self, urls: Vec<String>) -> Self {
        self.category_urls = urls;
        self
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .with_context(|| format!("request failed for {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status for {url}"))?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl NewsSource for EconomyMiddleEast {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn discover_links(&self) -> Result<Vec<String>> {
        let mut links = BTreeSet::new();

        for category_url in &self.category_urls {
            let html = self.fetch_html(category_url).await?;
            links.extend(extract_news_links(&html, category_url));
        }

        Ok(links.into_iter().collect())
    }

    async fn fetch_article(&self, url: &str) -> Result<ArticleContent> {
        let html = self.fetch_html(url).await?;
        parse_article(&html).with_context(|| format!("failed to parse article at {url}"))
    }
}

/// All `/news/` anchors on a category page, resolved to absolute URLs.
fn extract_news_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains("/news/"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Url::parse(href).ok().map(|u| u.to_string()),
        })
        .collect()
}

fn parse_article(html: &str) -> Result<ArticleContent> {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("article page has no title"))?;

    let publication_date = document
        .select(&MODIFIED_TIME)
        .next()
        .and_then(|m| m.value().attr("content"))
        .and_then(parse_article_date);

    let author = json_ld_author(&document).or_else(|| {
        document
            .select(&META_AUTHOR)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
    });

    let paragraphs: Vec<String> = document
        .select(&POST_CONTENT)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Err(anyhow!("article page has no body content"));
    }

    let raw_text = paragraphs.join("\n");
    let cleaned_text = clean_article_text(&raw_text);

    Ok(ArticleContent {
        title,
        author,
        publication_date,
        raw_text,
        cleaned_text,
    })
}

fn parse_article_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Author name from JSON-LD: a top-level NewsArticle object or one nested in
/// an `@graph` array.
fn json_ld_author(document: &Html) -> Option<String> {
    for script in document.select(&JSON_LD) {
        let text = script.text().collect::<String>();
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue;
        };

        if let Some(name) = news_article_author(&data) {
            return Some(name);
        }
        if let Some(graph) = data.get("@graph").and_then(|g| g.as_array()) {
            for item in graph {
                if let Some(name) = news_article_author(item) {
                    return Some(name);
                }
            }
        }
    }
    None
}

fn news_article_author(value: &serde_json::Value) -> Option<String> {
    if value.get("@type").and_then(|t| t.as_str()) != Some("NewsArticle") {
        return None;
    }
    value
        .get("author")
        .and_then(|a| a.get("name"))
        .and_then(|n| n.as_str())
        .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORY_PAGE: &str = r#"
        <html><body>
            <a href="/news/uae-gdp-growth/">UAE GDP</a>
            <a href="https://economymiddleeast.com/news/saudi-tender/">Tender</a>
            <a href="/newscategories/markets/">Markets</a>
            <a href="/about/">About</a>
            <a href="/news/uae-gdp-growth/">UAE GDP again</a>
        </body></html>
    "#;

    const ARTICLE_PAGE: &str = r#"
        <html>
        <head>
            <title> Saudi Arabia awards $2bn rail tender </title>
            <meta property="article:modified_time" content="2025-03-14T09:30:00+00:00" />
            <script type="application/ld+json">
                {"@graph": [
                    {"@type": "WebPage", "name": "irrelevant"},
                    {"@type": "NewsArticle", "author": {"name": "Dana Haddad"}}
                ]}
            </script>
        </head>
        <body>
            <div class="brxe-post-content">
                <p>Saudi Arabia awarded a $2bn rail tender on Tuesday.</p>
                <p></p>
                <p>Bids close in June.</p>
            </div>
        </body>
        </html>
    "#;

    #[test]
    fn category_page_links_are_absolute_and_deduped() {
        let links = extract_news_links(
            CATEGORY_PAGE,
            "https://economymiddleeast.com/newscategories/economy/",
        );
        let unique: BTreeSet<String> = links.into_iter().collect();

        assert_eq!(
            unique,
            BTreeSet::from([
                "https://economymiddleeast.com/news/saudi-tender/".to_string(),
                "https://economymiddleeast.com/news/uae-gdp-growth/".to_string(),
            ])
        );
    }

    #[test]
    fn article_page_parses_all_fields() {
        let article = parse_article(ARTICLE_PAGE).unwrap();

        assert_eq!(article.title, "Saudi Arabia awards $2bn rail tender");
        assert_eq!(article.author.as_deref(), Some("Dana Haddad"));
        assert_eq!(
            article.publication_date.unwrap().to_rfc3339(),
            "2025-03-14T09:30:00+00:00"
        );
        assert_eq!(
            article.raw_text,
            "Saudi Arabia awarded a $2bn rail tender on Tuesday.\nBids close in June."
        );
        assert!(article.cleaned_text.contains("rail tender"));
    }

    #[test]
    fn author_falls_back_to_meta_tag() {
        let html = r#"
            <html>
            <head>
                <title>Headline</title>
                <meta name="author" content="Newsroom Staff" />
            </head>
            <body><div class="brxe-post-content"><p>Body.</p></div></body>
            </html>
        "#;

        let article = parse_article(html).unwrap();
        assert_eq!(article.author.as_deref(), Some("Newsroom Staff"));
    }

    #[test]
    fn missing_body_is_an_error() {
        let html = "<html><head><title>Headline</title></head><body></body></html>";
        assert!(parse_article(html).is_err());
    }

    #[test]
    fn missing_date_is_none_not_error() {
        let html = r#"
            <html><head><title>Headline</title></head>
            <body><div class="brxe-post-content"><p>Body.</p></div></body></html>
        "#;

        let article = parse_article(html).unwrap();
        assert!(article.publication_date.is_none());
        assert!(article.author.is_none());
    }
}
