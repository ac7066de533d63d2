//! Configuration schema for aloochat.toml.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlooConfig {
    /// Identity the chat store scopes chats by.
    pub user_id: String,

    /// Path to the SQLite chat database.
    pub db_path: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Gemini API key. Falls back to `GEMINI_API_KEY`.
    pub gemini_api_key: String,

    /// Gemini model used for both selection and synthesis.
    pub gemini_model: String,

    /// Gemini REST base URL.
    pub gemini_api_url: String,

    /// OpenWeather API key. Falls back to `OPENWEATHER_API_KEY`.
    pub openweather_api_key: String,

    /// OpenWeather base URL.
    pub openweather_api_url: String,

    /// Nominatim geocoding base URL.
    pub geocoding_url: String,

    /// Optional GitHub token. Falls back to `GITHUB_TOKEN`.
    pub github_token: String,

    /// GitHub REST base URL.
    pub github_api_url: String,

    /// Wikipedia base URL; `{lang}` is replaced by the language code.
    pub wikipedia_url_template: String,

    /// Giphy API key. Falls back to `GIPHY_API_KEY`.
    pub giphy_api_key: String,

    /// Giphy base URL.
    pub giphy_api_url: String,

    /// Let the web client reach loopback and private addresses.
    pub webclient_allow_private_networks: bool,

    /// Web client timeout when the request doesn't name one.
    pub webclient_default_timeout_ms: u64,

    /// How many recent turns the tool-selection prompt sees.
    pub selection_history_window: usize,

    /// Deadline for selection + tool + synthesis, in seconds (0 = none).
    pub pipeline_timeout_secs: u64,

    /// Deadline for the degraded fallback reply, in seconds (0 = none).
    pub fallback_timeout_secs: u64,

    /// User-Agent sent to upstream APIs.
    pub user_agent: String,
}

impl Default for AlooConfig {
    fn default() -> Self {
        Self {
            user_id: "local".into(),
            db_path: "~/.aloochat/chats.db".into(),
            log_level: "info".into(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".into(),
            gemini_api_url: "https://generativelanguage.googleapis.com".into(),
            openweather_api_key: String::new(),
            openweather_api_url: "https://api.openweathermap.org".into(),
            geocoding_url: "https://nominatim.openstreetmap.org".into(),
            github_token: String::new(),
            github_api_url: "https://api.github.com".into(),
            wikipedia_url_template: "https://{lang}.wikipedia.org".into(),
            giphy_api_key: String::new(),
            giphy_api_url: "https://api.giphy.com".into(),
            webclient_allow_private_networks: false,
            webclient_default_timeout_ms: 10_000,
            selection_history_window: 20,
            pipeline_timeout_secs: 60,
            fallback_timeout_secs: 20,
            user_agent: "AlooChat/1.0".into(),
        }
    }
}

impl AlooConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved database path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    /// Fill empty credentials from the environment.
    ///
    /// Values already present in the file win.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots: [(&mut String, &str); 4] = [
            (&mut self.gemini_api_key, "GEMINI_API_KEY"),
            (&mut self.openweather_api_key, "OPENWEATHER_API_KEY"),
            (&mut self.giphy_api_key, "GIPHY_API_KEY"),
            (&mut self.github_token, "GITHUB_TOKEN"),
        ];
        for (slot, var) in slots {
            if slot.is_empty() {
                if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                    *slot = value.trim().to_string();
                }
            }
        }
    }

    pub fn pipeline_timeout(&self) -> Option<Duration> {
        secs(self.pipeline_timeout_secs)
    }

    pub fn fallback_timeout(&self) -> Option<Duration> {
        secs(self.fallback_timeout_secs)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_fills_only_empty_credentials() {
        let mut config = AlooConfig {
            gemini_api_key: "from-file".into(),
            ..AlooConfig::default()
        };
        config.apply_env(|var| match var {
            "GEMINI_API_KEY" => Some("from-env".into()),
            "OPENWEATHER_API_KEY" => Some(" ow-key ".into()),
            "GIPHY_API_KEY" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.gemini_api_key, "from-file");
        assert_eq!(config.openweather_api_key, "ow-key");
        assert!(config.giphy_api_key.is_empty());
        assert!(config.github_token.is_empty());
    }

    #[test]
    fn zero_disables_deadlines() {
        let config = AlooConfig {
            pipeline_timeout_secs: 0,
            ..AlooConfig::default()
        };
        assert_eq!(config.pipeline_timeout(), None);
        assert_eq!(config.fallback_timeout(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AlooConfig = toml::from_str("gemini_model = \"gemini-1.5-pro\"").unwrap();
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert_eq!(config.selection_history_window, 20);
        assert!(!config.webclient_allow_private_networks);
    }
}
