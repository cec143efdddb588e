//! Client for OpenAI-compatible completion servers.
//!
//! Local model servers (llama.cpp, vLLM and similar) expose the legacy
//! `/v1/completions` endpoint, which takes a raw prompt and accepts a
//! `grammar` field for constrained generation.

mod client;
mod conversions;
mod dto;

pub use client::OpenAICompatibleClient;
pub use dto::{CompletionRequest, CompletionResponse};
