//! Generic client for OpenAI-compatible completion servers.

use crate::openai_compat::conversions;
use crate::openai_compat::dto::{CompletionResponse, TokenizeRequest, TokenizeResponse};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use switchboard_core::{LlmResponse, TokenUsage};
use switchboard_error::{BackendError, BackendErrorKind};
use switchboard_interface::{InferenceClient, PredictOptions};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, trace};

/// Client for any server exposing `/v1/completions`.
///
/// Sends raw prompts, forwards the grammar for constrained generation and
/// supports server-sent-event streaming.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    provider_name: &'static str,
}

impl OpenAICompatibleClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, without the `/v1` suffix
    /// * `model` - Model identifier sent with every request
    /// * `provider_name` - Name of the provider (for logging/tracing)
    #[instrument(skip_all, fields(provider = provider_name, model = %model))]
    pub fn new(base_url: String, model: String, provider_name: &'static str) -> Self {
        debug!(
            provider = provider_name,
            model = %model,
            url = %base_url,
            "Created OpenAI-compatible client"
        );

        Self {
            client: Client::new(),
            api_key: None,
            model,
            base_url,
            provider_name,
        }
    }

    /// Sends `key` as a bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = self.provider_name, error = ?e, "HTTP request failed");
            BackendError::new(BackendErrorKind::Unavailable(format!(
                "Request failed: {}",
                e
            )))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                provider = self.provider_name,
                status = %status,
                error = %error_text,
                "API error"
            );

            return Err(BackendError::new(BackendErrorKind::Http {
                status_code: status.as_u16(),
                message: error_text,
            }));
        }

        Ok(response)
    }
}

#[async_trait]
impl InferenceClient for OpenAICompatibleClient {
    #[instrument(skip(self, options), fields(provider = self.provider_name, model = %self.model))]
    async fn predict(&self, options: &PredictOptions) -> Result<LlmResponse, BackendError> {
        let request = conversions::to_completion_request(options, &self.model, false)?;

        debug!(
            provider = self.provider_name,
            prompt_len = request.prompt().len(),
            constrained = request.grammar().is_some(),
            "Sending completion request"
        );

        let response: CompletionResponse = self
            .post("v1/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| {
                error!(provider = self.provider_name, error = ?e, "Failed to parse response");
                BackendError::new(BackendErrorKind::ResponseParsing(format!(
                    "Failed to parse JSON: {}",
                    e
                )))
            })?;

        conversions::from_completion_response(&response)
    }

    #[instrument(skip(self, options, tokens), fields(provider = self.provider_name, model = %self.model))]
    async fn predict_stream(
        &self,
        options: &PredictOptions,
        tokens: mpsc::Sender<String>,
    ) -> Result<LlmResponse, BackendError> {
        let request = conversions::to_completion_request(options, &self.model, true)?;
        let response = self.post("v1/completions", &request).await?;

        let mut events = response.bytes_stream().eventsource();
        let mut text = String::new();
        let mut chunk_count = 0u64;
        let mut reported_usage = None;
        let mut forwarding = true;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| {
                error!(provider = self.provider_name, error = %e, "Stream error");
                BackendError::new(BackendErrorKind::Stream(e.to_string()))
            })?;

            let data = event.data.trim();
            if data == "[DONE]" {
                break;
            }
            if data.is_empty() {
                continue;
            }

            let chunk: CompletionResponse = serde_json::from_str(data).map_err(|e| {
                BackendError::new(BackendErrorKind::ResponseParsing(format!(
                    "Invalid stream chunk: {}",
                    e
                )))
            })?;

            if let Some(usage) = conversions::to_token_usage(&chunk) {
                reported_usage = Some(usage);
            }

            let piece = conversions::chunk_text(&chunk);
            if piece.is_empty() {
                continue;
            }
            chunk_count += 1;
            text.push_str(piece);
            trace!(chunk_count, "Token received");

            if forwarding && tokens.send(piece.to_string()).await.is_err() {
                debug!("Token receiver closed, continuing without forwarding");
                forwarding = false;
            }
        }

        let usage = reported_usage.unwrap_or_else(|| TokenUsage::new(0, chunk_count));
        debug!(
            provider = self.provider_name,
            chunk_count,
            completion_tokens = usage.completion,
            "Stream finished"
        );
        Ok(LlmResponse::new(text, usage))
    }

    #[instrument(skip(self, text), fields(provider = self.provider_name))]
    async fn tokenize(&self, text: &str) -> Result<u64, BackendError> {
        let response: TokenizeResponse = self
            .post("tokenize", &TokenizeRequest { content: text })
            .await?
            .json()
            .await
            .map_err(|e| {
                BackendError::new(BackendErrorKind::ResponseParsing(format!(
                    "Failed to parse tokenize response: {}",
                    e
                )))
            })?;

        Ok(response.tokens.len() as u64)
    }

    fn provider_name(&self) -> &'static str {
        self.provider_name
    }
}
