//! Normalized tool results, one variant per tool.

use super::giphy::GiphyResult;
use super::github::GitHubResult;
use super::webclient::HttpExchange;
use super::weather::WeatherReport;
use super::wikipedia::WikipediaResult;
use serde::{Deserialize, Serialize};

/// What a successful tool execution produced.
///
/// Serialized as `{"tool": "<name>", "data": {...}}`; that JSON is both
/// what the synthesis prompt embeds and what the chat store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "data", rename_all = "lowercase")]
pub enum ToolOutput {
    Weather(WeatherReport),
    Github(GitHubResult),
    Wikipedia(WikipediaResult),
    Giphy(GiphyResult),
    Webclient(HttpExchange),
}

impl ToolOutput {
    /// Name of the tool that produced this output.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Weather(_) => "weather",
            Self::Github(_) => "github",
            Self::Wikipedia(_) => "wikipedia",
            Self::Giphy(_) => "giphy",
            Self::Webclient(_) => "webclient",
        }
    }

    /// Pretty JSON for prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
