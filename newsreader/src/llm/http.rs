// HTTP plumbing shared by the JSON-over-HTTPS generation backends.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::LlmRequest;

/// Generation settings a provider falls back to when a request leaves them unset.
#[derive(Debug, Clone, Copy)]
pub struct GenerationDefaults {
    pub timeout: Duration,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(super::DEFAULT_TIMEOUT_SECS),
            max_tokens: super::DEFAULT_MAX_TOKENS,
            temperature: super::DEFAULT_TEMPERATURE,
        }
    }
}

impl GenerationDefaults {
    pub fn new(timeout_secs: u64, max_tokens: usize, temperature: f32) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            max_tokens,
            temperature,
        }
    }

    /// The request's overrides, falling back to these defaults.
    pub fn resolve(&self, request: &LlmRequest) -> Self {
        Self {
            timeout: request
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(self.timeout),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.unwrap_or(self.temperature),
        }
    }
}

/// Send `body` as JSON and decode a JSON reply. Sending and decoding each get
/// `timeout`; a non-2xx status is an error carrying the response text.
pub async fn post_json<B, R>(
    request: reqwest::RequestBuilder,
    body: &B,
    timeout: Duration,
    backend: &str,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = tokio::time::timeout(timeout, request.json(body).send())
        .await
        .with_context(|| format!("{} request timed out", backend))?
        .with_context(|| format!("{} HTTP request failed", backend))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("{} API error {}: {}", backend, status, text);
    }

    tokio::time::timeout(timeout, response.json::<R>())
        .await
        .with_context(|| format!("{} request timed out", backend))?
        .with_context(|| format!("Failed to parse {} response", backend))
}

/// Blank generations are failures, never answers.
pub fn non_empty(content: String, backend: &str, reason: Option<&str>) -> Result<String> {
    if content.trim().is_empty() {
        anyhow::bail!(
            "{} returned an empty reply (finish reason: {})",
            backend,
            reason.unwrap_or("unknown")
        );
    }
    Ok(content)
}
