pub mod schema;

pub use schema::AlooConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default aloochat home directory (~/.aloochat).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".aloochat"))
        .unwrap_or_else(|| PathBuf::from(".aloochat"))
}

/// Load config from the given path, or return defaults.
///
/// Empty credentials are filled from the process environment.
pub fn load_config(path: &Path) -> Result<AlooConfig> {
    let mut config = if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read aloochat config file")?;
        toml::from_str(&contents).context("Failed to parse aloochat config (TOML)")?
    } else {
        AlooConfig::default()
    };
    config.apply_env(|var| std::env::var(var).ok());
    Ok(config)
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &AlooConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("aloochat.toml");
        let config = AlooConfig {
            user_id: "alice".into(),
            pipeline_timeout_secs: 5,
            ..AlooConfig::default()
        };
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.user_id, "alice");
        assert_eq!(loaded.pipeline_timeout_secs, 5);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.gemini_model, "gemini-2.0-flash");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aloochat.toml");
        std::fs::write(&path, "user_id = [").unwrap();
        assert!(load_config(&path).is_err());
    }
}
