use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Core trait for generative-text backends
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Request structure for LLM generation; unset fields fall back to provider defaults
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_TOKENS: usize = 2048;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub mod gemini;
pub mod http;
pub mod remote;
