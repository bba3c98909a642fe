use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::http::{self, GenerationDefaults};
use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// OpenAI-compatible `chat/completions` backend authenticated with a bearer token.
pub struct RemoteLlmProvider {
    api_url: String,
    api_key: String,
    model: String,
    defaults: GenerationDefaults,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
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
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let settings = self.defaults.resolve(&request);

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        let reply: ChatCompletionResponse = http::post_json(
            self.client.post(&self.api_url).bearer_auth(&self.api_key),
            &body,
            settings.timeout,
            "LLM",
        )
        .await?;

        let usage = reply
            .usage
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let choice = reply
            .choices
            .into_iter()
            .next()
            .context("LLM response has no choices")?;
        let content = http::non_empty(
            choice.message.content.unwrap_or_default(),
            "LLM",
            choice.finish_reason.as_deref(),
        )?;

        Ok(LlmResponse {
            content,
            usage,
            model: reply.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}
