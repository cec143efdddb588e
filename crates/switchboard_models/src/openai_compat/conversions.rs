//! Conversions between switchboard types and completion DTOs.

use crate::openai_compat::{CompletionRequest, CompletionResponse};
use switchboard_core::{LlmResponse, TokenUsage};
use switchboard_error::{BackendError, BackendErrorKind};
use switchboard_interface::PredictOptions;
use tracing::debug;

/// Builds a completion request from prediction options.
pub fn to_completion_request(
    options: &PredictOptions,
    model: &str,
    stream: bool,
) -> Result<CompletionRequest, BackendError> {
    CompletionRequest::builder()
        .model(model)
        .prompt(options.prompt.clone())
        .max_tokens(options.max_tokens)
        .temperature(options.temperature)
        .stop(options.stop.clone())
        .grammar(options.grammar.clone())
        .images(options.images.clone())
        .stream(stream)
        .build()
        .map_err(|e| {
            BackendError::new(BackendErrorKind::Inference(format!(
                "Failed to build completion request: {}",
                e
            )))
        })
}

/// Usage reported in a response, if any.
pub fn to_token_usage(response: &CompletionResponse) -> Option<TokenUsage> {
    response.usage.as_ref().map(|usage| {
        TokenUsage::new(
            usage.prompt_tokens.unwrap_or_default(),
            usage.completion_tokens.unwrap_or_default(),
        )
    })
}

/// Converts a non-streamed completion response.
pub fn from_completion_response(
    response: &CompletionResponse,
) -> Result<LlmResponse, BackendError> {
    let choice = response.choices.first().ok_or_else(|| {
        BackendError::new(BackendErrorKind::ResponseParsing(
            "Response contains no choices".to_string(),
        ))
    })?;

    let usage = to_token_usage(response).unwrap_or_default();
    debug!(
        prompt_tokens = usage.prompt,
        completion_tokens = usage.completion,
        finish_reason = ?choice.finish_reason,
        "Converted completion response"
    );

    Ok(LlmResponse::new(choice.text.clone(), usage))
}

/// Text increment carried by a stream chunk.
pub fn chunk_text(chunk: &CompletionResponse) -> &str {
    chunk
        .choices
        .first()
        .map(|c| c.text.as_str())
        .unwrap_or_default()
}
