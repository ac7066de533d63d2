//! GIF and meme search via Giphy.

use super::params::{self, Params};
use super::{endpoint, Tool, ToolDescriptor, ToolError, ToolOutput};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

static DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "giphy",
    description: "Search for GIFs and memes from Giphy to express emotions or reactions",
    parameters: &[
        ("query", "string - Search term for GIFs (e.g., 'happy', 'celebration', 'funny cat')"),
        ("limit", "number - Number of GIFs to return (default: 8, max: 25)"),
        ("rating", "string - Content rating: g, pg, pg-13, r (default: pg-13)"),
        ("type", "string - Type of content: gif, meme (default: gif)"),
    ],
};

const DEFAULT_LIMIT: i64 = 8;
const MAX_LIMIT: i64 = 25;
const RATINGS: [&str; 4] = ["g", "pg", "pg-13", "r"];
const DEFAULT_RATING: &str = "pg-13";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiphyResult {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub total_count: u64,
    pub gifs: Vec<GifDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GifDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
    pub gif_url: String,
    pub preview_url: String,
    pub original_url: String,
    pub width: u32,
    pub height: u32,
    pub rating: String,
    pub username: String,
    pub source: String,
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GiphySearch {
    pub query: String,
    pub search_term: String,
    pub limit: i64,
    pub rating: &'static str,
    pub meme: bool,
}

impl GiphySearch {
    pub fn from_params(params: &Params) -> Result<Self, ToolError> {
        let query = params::required_string(params, "query")?;
        let limit = params::integer(params, "limit")
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        let rating = params::string(params, "rating")
            .map(|r| r.to_ascii_lowercase())
            .and_then(|r| RATINGS.iter().copied().find(|known| *known == r))
            .unwrap_or(DEFAULT_RATING);
        let meme = params::string(params, "type")
            .map(|t| t.eq_ignore_ascii_case("meme"))
            .unwrap_or(false);

        let search_term = if meme && !query.to_lowercase().contains("meme") {
            format!("{} meme", query)
        } else {
            query.clone()
        };

        Ok(Self {
            query,
            search_term,
            limit,
            rating,
            meme,
        })
    }

    fn kind(&self) -> &'static str {
        if self.meme {
            "meme"
        } else {
            "gif"
        }
    }
}

// -- Upstream payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    data: Vec<GifPayload>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct GifPayload {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    rating: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    images: Images,
}

#[derive(Debug, Default, Deserialize)]
struct Images {
    fixed_height: Option<Rendition>,
    fixed_height_small: Option<Rendition>,
    original: Option<Rendition>,
}

#[derive(Debug, Default, Deserialize)]
struct Rendition {
    #[serde(default)]
    url: String,
    width: Option<String>,
    height: Option<String>,
}

fn non_empty(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

impl From<GifPayload> for GifDescriptor {
    fn from(gif: GifPayload) -> Self {
        let fixed = gif.images.fixed_height.unwrap_or_default();
        let preview = gif.images.fixed_height_small.map(|r| r.url);
        let original = gif.images.original.map(|r| r.url);
        let dimension = |v: &Option<String>| -> u32 {
            v.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
        };

        GifDescriptor {
            width: dimension(&fixed.width),
            height: dimension(&fixed.height),
            preview_url: preview.unwrap_or_else(|| fixed.url.clone()),
            original_url: original.unwrap_or_else(|| fixed.url.clone()),
            gif_url: fixed.url,
            id: gif.id,
            title: non_empty(gif.title, "Untitled GIF"),
            url: gif.url,
            rating: gif.rating,
            username: non_empty(gif.username, "Anonymous"),
            source: non_empty(gif.source, "Unknown"),
        }
    }
}

pub struct GiphyTool {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GiphyTool {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.trim().to_string(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl Tool for GiphyTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &DESCRIPTOR
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError> {
        if self.api_key.is_empty() {
            return Err(ToolError::NotConfigured("Giphy API key"));
        }
        let search = GiphySearch::from_params(params)?;

        let url = endpoint(&self.base_url, &["v1", "gifs", "search"])?;
        let limit = search.limit.to_string();
        let resp = self
            .http
            .get(url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("q", search.search_term.as_str()),
                ("limit", limit.as_str()),
                ("rating", search.rating),
                ("lang", "en"),
            ])
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::FORBIDDEN => {
                return Err(ToolError::Upstream(
                    "Giphy API key is invalid or quota exceeded".into(),
                ))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ToolError::Upstream(
                    "Giphy rate limit exceeded, try again later".into(),
                ))
            }
            s => {
                return Err(ToolError::Upstream(format!(
                    "Giphy API request failed ({})",
                    s.as_u16()
                )))
            }
        }

        let payload: SearchPayload = resp
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Unreadable Giphy response: {}", e)))?;

        let gifs: Vec<GifDescriptor> = payload.data.into_iter().map(Into::into).collect();
        let total_count = payload
            .pagination
            .map(|p| p.total_count)
            .unwrap_or(gifs.len() as u64);
        info!("Giphy '{}' returned {} results", search.search_term, gifs.len());

        let message = gifs
            .is_empty()
            .then(|| format!("No GIFs found for \"{}\". Try a different search term!", search.query));

        Ok(ToolOutput::Giphy(GiphyResult {
            kind: search.kind().to_string(),
            query: search.search_term,
            total_count,
            gifs,
            message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn tool(server: &MockServer) -> GiphyTool {
        GiphyTool::new(reqwest::Client::new(), "gk", &server.uri())
    }

    #[test]
    fn limits_and_ratings_are_normalized() {
        let low = GiphySearch::from_params(&params(json!({"query": "cat", "limit": 0}))).unwrap();
        assert_eq!(low.limit, 1);

        let high = GiphySearch::from_params(&params(json!({"query": "cat", "limit": 100}))).unwrap();
        assert_eq!(high.limit, 25);

        let bad = GiphySearch::from_params(&params(json!({"query": "cat", "rating": "invalid"}))).unwrap();
        assert_eq!(bad.rating, "pg-13");

        let upper = GiphySearch::from_params(&params(json!({"query": "cat", "rating": "PG"}))).unwrap();
        assert_eq!(upper.rating, "pg");

        let default = GiphySearch::from_params(&params(json!({"query": "cat"}))).unwrap();
        assert_eq!(default.limit, 8);
        assert!(!default.meme);
    }

    #[test]
    fn meme_mode_extends_the_search_term_once() {
        let plain = GiphySearch::from_params(&params(json!({"query": "doge", "type": "meme"}))).unwrap();
        assert_eq!(plain.search_term, "doge meme");
        assert_eq!(plain.query, "doge");

        let already = GiphySearch::from_params(&params(json!({"query": "Doge Meme", "type": "meme"}))).unwrap();
        assert_eq!(already.search_term, "Doge Meme");
    }

    #[tokio::test]
    async fn search_maps_gif_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/gifs/search"))
            .and(query_param("api_key", "gk"))
            .and(query_param("q", "happy"))
            .and(query_param("limit", "2"))
            .and(query_param("rating", "pg-13"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "id": "abc",
                        "title": "Happy Dance",
                        "url": "https://giphy.com/gifs/abc",
                        "rating": "g",
                        "username": "dancer",
                        "source": "",
                        "images": {
                            "fixed_height": {"url": "https://media/abc.gif", "width": "356", "height": "200"},
                            "fixed_height_small": {"url": "https://media/abc-small.gif"},
                            "original": {"url": "https://media/abc-orig.gif"}
                        }
                    },
                    {"id": "def", "title": "", "url": "https://giphy.com/gifs/def", "rating": "g"}
                ],
                "pagination": {"total_count": 1200}
            })))
            .mount(&server)
            .await;

        let out = tool(&server)
            .execute(&params(json!({"query": "happy", "limit": 2})))
            .await
            .unwrap();
        let ToolOutput::Giphy(result) = out else {
            panic!("expected giphy output");
        };
        assert_eq!(result.total_count, 1200);
        assert_eq!(result.kind, "gif");
        assert!(result.message.is_none());

        let first = &result.gifs[0];
        assert_eq!(first.gif_url, "https://media/abc.gif");
        assert_eq!(first.preview_url, "https://media/abc-small.gif");
        assert_eq!((first.width, first.height), (356, 200));
        assert_eq!(first.source, "Unknown");

        let second = &result.gifs[1];
        assert_eq!(second.title, "Untitled GIF");
        assert_eq!(second.username, "Anonymous");
    }

    #[tokio::test]
    async fn empty_results_carry_a_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let out = tool(&server)
            .execute(&params(json!({"query": "zzzz"})))
            .await
            .unwrap();
        let ToolOutput::Giphy(result) = out else {
            panic!("expected giphy output");
        };
        assert!(result.gifs.is_empty());
        assert_eq!(result.total_count, 0);
        assert!(result.message.unwrap().contains("zzzz"));
    }

    #[tokio::test]
    async fn meme_result_reports_the_extended_term() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "doge meme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let out = tool(&server)
            .execute(&params(json!({"query": "doge", "type": "meme"})))
            .await
            .unwrap();
        let ToolOutput::Giphy(result) = out else {
            panic!("expected giphy output");
        };
        assert_eq!(result.query, "doge meme");
        assert_eq!(result.kind, "meme");
    }

    #[tokio::test]
    async fn rate_limit_has_its_own_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = tool(&server)
            .execute(&params(json!({"query": "cat"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }

    #[tokio::test]
    async fn missing_key_wins_over_missing_query() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = GiphyTool::new(reqwest::Client::new(), "", &server.uri())
            .execute(&Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Giphy API key not configured");
    }
}
