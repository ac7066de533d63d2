pub mod giphy;
pub mod github;
pub mod output;
pub mod params;
pub mod traits;
pub mod webclient;
pub mod weather;
pub mod wikipedia;

pub use output::ToolOutput;
pub use params::Params;
pub use traits::{Tool, ToolDescriptor, ToolError};

use crate::config::AlooConfig;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Fixed catalog of tools, built once at startup and shared read-only.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A tool with the same name is replaced in place.
    pub fn register<T: Tool + 'static>(self, tool: T) -> Self {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
        self
    }

    /// Find a tool by name, ignoring ASCII case.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// Render the whole catalog for the selection prompt, in registration order.
    pub fn describe_all(&self) -> String {
        let mut out = String::new();
        for tool in &self.tools {
            let desc = tool.descriptor();
            out.push_str(&format!("- {}: {}\n  Parameters:\n", desc.name, desc.description));
            for (name, note) in desc.parameters {
                out.push_str(&format!("    {}: {}\n", name, note));
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Build the standard five-tool registry from config.
pub fn default_registry(
    config: &AlooConfig,
    http: reqwest::Client,
) -> Result<ToolRegistry, ToolError> {
    let webclient = webclient::WebClientTool::new(webclient::WebClientSettings {
        allow_private_networks: config.webclient_allow_private_networks,
        default_timeout_ms: config.webclient_default_timeout_ms,
    })?;

    let registry = ToolRegistry::new()
        .register(weather::WeatherTool::new(
            http.clone(),
            &config.openweather_api_key,
            &config.geocoding_url,
            &config.openweather_api_url,
            &config.user_agent,
        ))
        .register(github::GitHubTool::new(
            http.clone(),
            &config.github_api_url,
            &config.github_token,
            &config.user_agent,
        ))
        .register(wikipedia::WikipediaTool::new(
            http.clone(),
            &config.wikipedia_url_template,
            &config.user_agent,
        ))
        .register(giphy::GiphyTool::new(
            http,
            &config.giphy_api_key,
            &config.giphy_api_url,
        ))
        .register(webclient);

    debug!("Registered {} tools", registry.len());
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Append percent-encoded path segments to a base URL.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ToolError> {
    let mut url = Url::parse(base)
        .map_err(|e| ToolError::Upstream(format!("invalid upstream URL {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ToolError::Upstream(format!("invalid upstream URL {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Stub(&'static ToolDescriptor);

    #[async_trait]
    impl Tool for Stub {
        fn descriptor(&self) -> &ToolDescriptor {
            self.0
        }

        async fn execute(&self, _params: &Params) -> Result<ToolOutput, ToolError> {
            Err(ToolError::Upstream("stub".into()))
        }
    }

    static ALPHA: ToolDescriptor = ToolDescriptor {
        name: "alpha",
        description: "First tool",
        parameters: &[("query", "string - what to look up")],
    };
    static BETA: ToolDescriptor = ToolDescriptor {
        name: "beta",
        description: "Second tool",
        parameters: &[],
    };
    static ALPHA_V2: ToolDescriptor = ToolDescriptor {
        name: "alpha",
        description: "Replacement",
        parameters: &[],
    };

    #[test]
    fn describe_all_keeps_registration_order() {
        let registry = ToolRegistry::new().register(Stub(&BETA)).register(Stub(&ALPHA));
        let text = registry.describe_all();
        let beta = text.find("- beta: Second tool").unwrap();
        let alpha = text.find("- alpha: First tool").unwrap();
        assert!(beta < alpha);
        assert!(text.contains("    query: string - what to look up"));
    }

    #[test]
    fn lookup_ignores_case_and_misses_unknown_names() {
        let registry = ToolRegistry::new().register(Stub(&ALPHA));
        assert!(registry.lookup("ALPHA").is_some());
        assert!(registry.lookup(" alpha ").is_some());
        assert!(registry.lookup("stock_prices").is_none());
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let registry = ToolRegistry::new()
            .register(Stub(&ALPHA))
            .register(Stub(&BETA))
            .register(Stub(&ALPHA_V2));
        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter().map(|t| t.descriptor().description).collect();
        assert_eq!(names, ["Replacement", "Second tool"]);
    }

    #[test]
    fn default_registry_has_all_five_tools() {
        let registry = default_registry(&AlooConfig::default(), reqwest::Client::new()).unwrap();
        let names: Vec<_> = registry.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["weather", "github", "wikipedia", "giphy", "webclient"]);
        assert!(!registry.lookup("weather").unwrap().is_configured());
        assert!(registry.lookup("wikipedia").unwrap().is_configured());
    }

    #[test]
    fn endpoint_encodes_segments() {
        let url = endpoint(
            "https://en.wikipedia.org/",
            &["api", "rest_v1", "page", "summary", "AC/DC band"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/AC%2FDC%20band"
        );
    }
}
