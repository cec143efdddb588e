//! Backend service and inference client traits.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use switchboard_channels::ResultReceiver;
use switchboard_core::{BackendConfig, Choice, GenerationRequest, LlmResponse, PromptBundle};
use switchboard_error::BackendError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Maps one backend completion to a response choice.
///
/// Called once per completion, in completion order.
pub type ChoiceMapper = Arc<dyn Fn(&LlmResponse) -> Choice + Send + Sync>;

/// Channels returned by [`LlmBackend::generate_text`] for one prompt.
#[derive(Debug)]
pub struct GenerateTextChannels {
    /// Receives exactly one bundle, or one error
    pub bundle: ResultReceiver<PromptBundle>,
    /// Every completion as it finishes, when requested
    pub completions: Option<ResultReceiver<LlmResponse>>,
    /// Every token as it is generated, when requested
    pub tokens: Option<ResultReceiver<LlmResponse>>,
}

/// Input to a single inference call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceInput {
    /// Prompt text
    pub text: String,
    /// Base64 or URL images attached to the prompt
    pub images: Vec<String>,
}

impl InferenceInput {
    /// Text-only input.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    /// Sets the images.
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// A running inference call.
#[derive(Debug)]
pub struct InferenceHandle {
    /// Receives the completed response, or an error
    pub results: ResultReceiver<LlmResponse>,
    /// Cancels the call
    pub cancel: CancellationToken,
}

/// The backend service the orchestrator generates with.
///
/// Obtaining a model instance, loading it and keeping it healthy is the
/// implementation's business. Errors after a call has started travel inside
/// the returned channels.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generates `config.parameters.n` completions for one prompt.
    ///
    /// Every completion passes through `mapper`. The bundle channel receives
    /// one [`PromptBundle`] with summed usage. Completion and token channels
    /// exist only when the matching `notify_on_*` flag is set; the token
    /// channel must stop receiving items once the request is cancelled.
    async fn generate_text(
        &self,
        prompt: String,
        request: Arc<GenerationRequest>,
        config: Arc<BackendConfig>,
        mapper: ChoiceMapper,
        notify_on_prompt_result: bool,
        notify_on_token: bool,
    ) -> Result<GenerateTextChannels, BackendError>;

    /// Runs one completion and reports its result on a channel.
    ///
    /// With `tokenize` set, no text is generated and only the prompt token
    /// count is reported.
    async fn inference(
        &self,
        cancel: CancellationToken,
        input: InferenceInput,
        config: &BackendConfig,
        tokenize: bool,
    ) -> Result<InferenceHandle, BackendError>;

    /// Post-processes a raw reply according to the model's settings.
    fn finetune(&self, config: &BackendConfig, prompt: &str, reply: &str) -> String;
}

/// Parameters for one raw prediction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictOptions {
    /// Prompt text
    pub prompt: String,
    /// Attached images
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Output grammar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<String>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl PredictOptions {
    /// Options for `input` under the model's resolved settings.
    pub fn from_config(config: &BackendConfig, input: &InferenceInput) -> Self {
        Self {
            prompt: input.text.clone(),
            images: input.images.clone(),
            grammar: config.grammar.clone().filter(|g| !g.is_empty()),
            max_tokens: config.parameters.max_tokens,
            temperature: config.parameters.temperature,
            stop: config.parameters.stop.clone(),
        }
    }
}

/// Low-level client for a model server.
///
/// [`LlmBackend`] implementations build on this to run completions.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Runs one completion to the end.
    async fn predict(&self, options: &PredictOptions) -> Result<LlmResponse, BackendError>;

    /// Runs one completion, sending each token to `tokens` as it arrives.
    ///
    /// Returns the full response once generation ends. A closed `tokens`
    /// receiver is not an error.
    async fn predict_stream(
        &self,
        options: &PredictOptions,
        tokens: mpsc::Sender<String>,
    ) -> Result<LlmResponse, BackendError>;

    /// Counts the tokens in `text`.
    async fn tokenize(&self, text: &str) -> Result<u64, BackendError>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<C: InferenceClient + ?Sized> InferenceClient for Arc<C> {
    async fn predict(&self, options: &PredictOptions) -> Result<LlmResponse, BackendError> {
        (**self).predict(options).await
    }

    async fn predict_stream(
        &self,
        options: &PredictOptions,
        tokens: mpsc::Sender<String>,
    ) -> Result<LlmResponse, BackendError> {
        (**self).predict_stream(options, tokens).await
    }

    async fn tokenize(&self, text: &str) -> Result<u64, BackendError> {
        (**self).tokenize(text).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
