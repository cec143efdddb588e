//! Data transfer objects for OpenAI-compatible completion servers.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Completion request body.
#[derive(Debug, Clone, Serialize, Builder, Getters)]
#[builder(setter(into))]
pub struct CompletionRequest {
    /// Model identifier
    model: String,
    /// Prompt text
    prompt: String,
    /// Maximum tokens to generate
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Sampling temperature
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Stop sequences
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    /// Output grammar
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    grammar: Option<String>,
    /// Attached images
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    /// Enable streaming
    #[builder(default)]
    stream: bool,
}

impl CompletionRequest {
    /// Creates a new builder for CompletionRequest.
    pub fn builder() -> CompletionRequestBuilder {
        CompletionRequestBuilder::default()
    }
}

/// A choice in a completion response or stream chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    /// Generated text, or the text increment in a stream chunk
    #[serde(default)]
    pub text: String,
    /// Reason for finishing
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: Option<u64>,
}

/// Completion response body, also the shape of each stream chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Response choices
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

/// Tokenize request body.
#[derive(Debug, Clone, Serialize)]
pub struct TokenizeRequest<'a> {
    /// Text to tokenize
    pub content: &'a str,
}

/// Tokenize response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenizeResponse {
    /// Token ids
    #[serde(default)]
    pub tokens: Vec<serde_json::Value>,
}
