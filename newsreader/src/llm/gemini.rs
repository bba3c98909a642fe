use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::http::{self, GenerationDefaults};
use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini provider speaking the `generateContent` REST API
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    defaults: GenerationDefaults,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            defaults: GenerationDefaults::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(mut self, timeout_secs: u64, max_tokens: usize, temperature: f32) -> Self {
        self.defaults = GenerationDefaults::new(timeout_secs, max_tokens, temperature);
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let settings = self.defaults.resolve(&request);

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: settings.max_tokens,
                temperature: settings.temperature,
            },
        };

        let reply: GenerateContentResponse = http::post_json(
            self.client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key),
            &body,
            settings.timeout,
            "Gemini",
        )
        .await?;

        let candidate = reply
            .candidates
            .into_iter()
            .next()
            .context("Gemini response has no candidates")?;

        // A blocked candidate arrives without content; its finish reason says why.
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let content = http::non_empty(text, "Gemini", candidate.finish_reason.as_deref())?;

        let usage = reply
            .usage_metadata
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            usage,
            model: reply.model_version.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// generateContent request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}
