/*!
common/src/lib.rs

Shared configuration types for the AI News Reader.

This file provides:
- Config data structures (deserialized from TOML, every section optional)
- An async loader that layers an override file on top of a defaults file
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP server section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g. "0.0.0.0")
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Directory holding `index.html` served at `/`
    pub static_dir: Option<String>,
}

/// Article fetching configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

/// Settings for one generative-text endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// LLM top-level config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "gemini", "remote"
    pub gemini: Option<RemoteLlmConfig>,
    // OpenAI-compatible endpoint
    pub remote: Option<RemoteLlmConfig>,
}

/// Selector lists and thresholds used by the content extractor.
/// Any list left unset keeps the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub title_selectors: Option<Vec<String>>,
    pub strip_selectors: Option<Vec<String>>,
    pub content_selectors: Option<Vec<String>>,
    pub author_selectors: Option<Vec<String>>,
    pub date_selectors: Option<Vec<String>>,
    pub min_content_chars: Option<usize>,
    pub fallback_title: Option<String>,
}

/// Conversation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// How many previous turns are replayed into a chat prompt
    pub history_turns: Option<usize>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: Option<ServerConfig>,
    pub fetch: Option<FetchConfig>,
    pub llm: Option<LlmConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub chat: Option<ChatConfig>,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// The endpoint settings for the selected adapter, if any were configured.
    pub fn llm_endpoint(&self) -> Option<&RemoteLlmConfig> {
        let llm = self.llm.as_ref()?;
        match llm.adapter.as_deref().unwrap_or("gemini") {
            "remote" => llm.remote.as_ref(),
            _ => llm.gemini.as_ref(),
        }
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [server]
            port = 5000

            [fetch]
            timeout_seconds = 10

            [llm]
            adapter = "gemini"

            [llm.gemini]
            model = "gemini-1.5-flash"
            api_key_env = "GEMINI_API_KEY"

            [extraction]
            content_selectors = ["article", ".story"]
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.server.as_ref().and_then(|s| s.port), Some(5000));
        assert_eq!(cfg.fetch.as_ref().and_then(|f| f.timeout_seconds), Some(10));
        assert_eq!(
            cfg.llm_endpoint().and_then(|e| e.model.as_deref()),
            Some("gemini-1.5-flash")
        );
        let selectors = cfg.extraction.and_then(|e| e.content_selectors).unwrap();
        assert_eq!(selectors, vec!["article", ".story"]);
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert!(cfg.server.is_none());
        assert!(cfg.llm_endpoint().is_none());
    }

    #[test]
    fn remote_adapter_selects_remote_endpoint() {
        let toml = r#"
            [llm]
            adapter = "remote"

            [llm.gemini]
            model = "gemini-1.5-flash"

            [llm.remote]
            model = "gpt-4o-mini"
        "#;
        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(
            cfg.llm_endpoint().and_then(|e| e.model.as_deref()),
            Some("gpt-4o-mini")
        );
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        fs::write(
            &default_path,
            "[server]\nbind = \"127.0.0.1\"\nport = 5000\n\n[fetch]\ntimeout_seconds = 10\n",
        )
        .expect("write defaults");
        fs::write(&override_path, "[server]\nport = 8080\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        let server = cfg.server.expect("server section");
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(cfg.fetch.and_then(|f| f.timeout_seconds), Some(10));
    }

    #[tokio::test]
    async fn missing_files_yield_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_with_defaults(
            Some(&dir.path().join("nope.toml")),
            Some(&dir.path().join("also-nope.toml")),
        )
        .await
        .expect("load config");
        assert!(cfg.server.is_none());
        assert!(cfg.chat.is_none());
    }
}
