/*
newsreader - main.rs
Loads configuration, builds the generation backend once and serves the HTTP API.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsreader::llm::{self, gemini, LlmProvider};
use newsreader::server::{launch_rocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "newsreader", about = "Summarize news articles and chat about them")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // API keys usually live in .env during development
    if let Ok(path) = dotenv::dotenv() {
        info!(path = ?path, "loaded environment file");
    }

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let provider = match create_llm_provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to initialize LLM provider: {:#}", e);
            return Err(e);
        }
    };

    let state = AppState::new(&config, provider)?;

    info!("Launching Rocket HTTP server");
    if let Err(e) = launch_rocket(state, &config).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Create the LLM provider selected by `llm.adapter` ("gemini" unless configured otherwise).
fn create_llm_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    let adapter = config
        .llm
        .as_ref()
        .and_then(|l| l.adapter.as_deref())
        .unwrap_or("gemini");
    let endpoint = config.llm_endpoint().cloned().unwrap_or_default();

    let default_key_env = match adapter {
        "gemini" => "GEMINI_API_KEY",
        "remote" => "OPENAI_API_KEY",
        other => anyhow::bail!("Unknown LLM adapter type: {}", other),
    };
    let api_key_env = endpoint.api_key_env.as_deref().unwrap_or(default_key_env);
    let api_key = std::env::var(api_key_env)
        .with_context(|| format!("{} environment variable is required", api_key_env))?;

    let timeout_secs = endpoint.timeout_seconds.unwrap_or(llm::DEFAULT_TIMEOUT_SECS);
    let max_tokens = endpoint.max_tokens.unwrap_or(llm::DEFAULT_MAX_TOKENS);
    let temperature = endpoint.temperature.unwrap_or(llm::DEFAULT_TEMPERATURE);

    if adapter == "gemini" {
        let model = endpoint.model.unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
        let api_url = endpoint.api_url.unwrap_or_else(|| gemini::DEFAULT_API_URL.to_string());
        info!("LLM provider initialized: gemini ({}) at {}", model, api_url);
        let provider = gemini::GeminiProvider::new(api_url, api_key, model)
            .with_defaults(timeout_secs, max_tokens, temperature);
        Ok(Arc::new(provider))
    } else {
        let model = endpoint.model.unwrap_or_else(|| "gpt-4o-mini".to_string());
        let api_url = endpoint
            .api_url
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
        info!("LLM provider initialized: remote ({}) at {}", model, api_url);
        let provider = llm::remote::RemoteLlmProvider::new(api_url, api_key, model)
            .with_defaults(timeout_secs, max_tokens, temperature);
        Ok(Arc::new(provider))
    }
}
