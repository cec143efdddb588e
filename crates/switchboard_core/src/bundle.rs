//! Backend results: single completions and per-prompt bundles.

use crate::Choice;
use serde::{Deserialize, Serialize};

/// Token counts reported by the backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt: u64,
    /// Completion tokens
    pub completion: u64,
}

impl TokenUsage {
    /// Creates token usage.
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self { prompt, completion }
    }

    /// Sum of prompt and completion tokens.
    pub fn total(&self) -> u64 {
        self.prompt + self.completion
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt += rhs.prompt;
        self.completion += rhs.completion;
    }
}

/// One backend completion, or one streamed token of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text
    pub response: String,
    /// Usage so far
    pub usage: TokenUsage,
}

impl LlmResponse {
    /// Creates a response.
    pub fn new(response: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            response: response.into(),
            usage,
        }
    }
}

/// Everything the backend produced for one fanned-out prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PromptBundle {
    /// Usage summed over the prompt's completions
    usage: TokenUsage,
    /// Mapped choices, one per completion
    choices: Vec<Choice>,
}

impl PromptBundle {
    /// Creates a bundle.
    pub fn new(usage: TokenUsage, choices: Vec<Choice>) -> Self {
        Self { usage, choices }
    }

    /// Consumes the bundle, returning its choices.
    pub fn into_choices(self) -> Vec<Choice> {
        self.choices
    }
}
