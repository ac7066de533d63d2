//! Wikipedia article summaries.
//!
//! Tries the REST summary endpoint by title first. A disambiguation page
//! or a failed direct lookup falls back to the search API, whose top hit
//! is then summarized.

use super::params::{self, Params};
use super::{endpoint, Tool, ToolDescriptor, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

static DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "wikipedia",
    description: "Search Wikipedia articles and get summaries for educational and factual information. Perfect for questions starting with \"What is\", \"Who is\", \"Explain\", \"Tell me about\", etc.",
    parameters: &[
        ("query", "Topic or article title to search for"),
        ("language", "Language code (default: en)"),
        ("sentences", "Number of sentences in summary (default: 3)"),
    ],
};

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_SENTENCES: i64 = 3;
const MAX_SENTENCES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WikipediaResult {
    Found(WikipediaArticle),
    /// No article matched; returned as data so the reply can suggest next steps.
    NotFound {
        message: String,
        query: String,
        suggestions: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikipediaArticle {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub coordinates: Option<ArticleCoordinates>,
    pub language: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub last_modified: Option<String>,
    pub description: Option<String>,
    pub wikibase_item: Option<String>,
    pub search_result: bool,
    pub original_query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArticleCoordinates {
    pub lat: f64,
    pub lon: f64,
}

// -- Upstream payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(rename = "type")]
    page_type: Option<String>,
    content_urls: Option<ContentUrls>,
    thumbnail: Option<Thumbnail>,
    coordinates: Option<ArticleCoordinates>,
    timestamp: Option<String>,
    description: Option<String>,
    wikibase_item: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

/// Keep the first `sentences` fragments of a `". "`-split extract.
///
/// Deliberately naive: abbreviations like "Dr. " count as boundaries.
pub fn truncate_sentences(text: &str, sentences: usize) -> String {
    let parts: Vec<&str> = text.split(". ").collect();
    if sentences == 0 || parts.len() <= sentences {
        return text.to_string();
    }
    format!("{}.", parts[..sentences].join(". "))
}

/// Language codes end up in a hostname, so only plain codes pass.
fn sanitize_language(value: Option<String>) -> String {
    value
        .map(|l| l.to_ascii_lowercase())
        .filter(|l| {
            (2..=12).contains(&l.len())
                && l.chars().all(|c| c.is_ascii_lowercase() || c == '-')
                && !l.starts_with('-')
                && !l.ends_with('-')
        })
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// Wikipedia tool. Keyless.
pub struct WikipediaTool {
    http: reqwest::Client,
    url_template: String,
    user_agent: String,
}

enum DirectLookup {
    Article(SummaryPayload),
    NeedsSearch,
}

impl WikipediaTool {
    pub fn new(http: reqwest::Client, url_template: &str, user_agent: &str) -> Self {
        Self {
            http,
            url_template: url_template.to_string(),
            user_agent: format!("{} (Educational AI Assistant)", user_agent),
        }
    }

    fn base_url(&self, language: &str) -> String {
        self.url_template.replace("{lang}", language)
    }

    fn get(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn direct(&self, base: &str, title: &str) -> Result<DirectLookup, ToolError> {
        let url = endpoint(base, &["api", "rest_v1", "page", "summary", title])?;
        let resp = match self.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Wikipedia summary request failed, trying search: {}", e);
                return Ok(DirectLookup::NeedsSearch);
            }
        };
        if !resp.status().is_success() {
            debug!("Wikipedia summary for '{}' returned {}", title, resp.status());
            return Ok(DirectLookup::NeedsSearch);
        }
        let summary: SummaryPayload = match resp.json().await {
            Ok(s) => s,
            Err(_) => return Ok(DirectLookup::NeedsSearch),
        };
        if summary.page_type.as_deref() == Some("disambiguation") {
            debug!("'{}' is a disambiguation page", title);
            return Ok(DirectLookup::NeedsSearch);
        }
        Ok(DirectLookup::Article(summary))
    }

    async fn search_title(&self, base: &str, query: &str) -> Result<Option<String>, ToolError> {
        let mut url = endpoint(base, &["w", "api.php"])?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("list", "search")
            .append_pair("srsearch", query)
            .append_pair("srlimit", "1");

        let resp = self.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ToolError::Upstream(format!(
                "Wikipedia search failed ({})",
                resp.status().as_u16()
            )));
        }
        let payload: SearchPayload = resp
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Unreadable Wikipedia search response: {}", e)))?;

        Ok(payload
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }

    async fn summary(&self, base: &str, title: &str) -> Result<SummaryPayload, ToolError> {
        let url = endpoint(base, &["api", "rest_v1", "page", "summary", title])?;
        let resp = self.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ToolError::Upstream(format!(
                "Wikipedia summary fetch failed ({})",
                resp.status().as_u16()
            )));
        }
        resp.json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Unreadable Wikipedia summary: {}", e)))
    }

    fn article(
        &self,
        base: &str,
        language: &str,
        summary: SummaryPayload,
        sentences: usize,
        original_query: Option<String>,
    ) -> WikipediaArticle {
        let fallback_url = endpoint(base, &["wiki", &summary.title])
            .map(|u| u.to_string())
            .unwrap_or_default();
        WikipediaArticle {
            summary: truncate_sentences(&summary.extract, sentences),
            url: summary
                .content_urls
                .and_then(|c| c.desktop)
                .and_then(|d| d.page)
                .unwrap_or(fallback_url),
            thumbnail: summary.thumbnail.map(|t| t.source),
            coordinates: summary.coordinates,
            language: language.to_string(),
            page_type: summary.page_type.unwrap_or_else(|| "standard".into()),
            last_modified: summary.timestamp,
            description: summary.description,
            wikibase_item: summary.wikibase_item,
            search_result: original_query.is_some(),
            original_query,
            title: summary.title,
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError> {
        let query = params::required_string(params, "query")?;
        let language = sanitize_language(params::string(params, "language"));
        let sentences = params::integer(params, "sentences")
            .unwrap_or(DEFAULT_SENTENCES)
            .clamp(1, MAX_SENTENCES) as usize;
        let base = self.base_url(&language);

        info!("Wikipedia lookup for '{}' ({})", query, language);

        if let DirectLookup::Article(summary) = self.direct(&base, &query).await? {
            let article = self.article(&base, &language, summary, sentences, None);
            return Ok(ToolOutput::Wikipedia(WikipediaResult::Found(article)));
        }

        let Some(title) = self.search_title(&base, &query).await? else {
            return Ok(ToolOutput::Wikipedia(WikipediaResult::NotFound {
                message: format!("No articles found for \"{}\". Try a different search term.", query),
                query,
                suggestions: vec![
                    "Try more specific terms".into(),
                    "Check spelling".into(),
                    "Try related keywords".into(),
                ],
            }));
        };

        debug!("Wikipedia search resolved '{}' to '{}'", query, title);
        let summary = self.summary(&base, &title).await?;
        let article = self.article(&base, &language, summary, sentences, Some(query));
        Ok(ToolOutput::Wikipedia(WikipediaResult::Found(article)))
    }
}
