//! Backend service over an inference client.

use crate::finetune;
use async_trait::async_trait;
use std::sync::Arc;
use switchboard_channels::{ResultSender, result_channel};
use switchboard_core::{
    BackendConfig, GenerationRequest, LlmResponse, PromptBundle, TokenUsage,
};
use switchboard_error::BackendError;
use switchboard_interface::{
    ChoiceMapper, GenerateTextChannels, InferenceClient, InferenceHandle, InferenceInput,
    LlmBackend, PredictOptions,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Backend service generating through an [`InferenceClient`].
///
/// Every call runs on its own task and reports through result channels, so
/// backend failures reach the caller as `Err` items rather than panics.
#[derive(Debug)]
pub struct LocalBackendService<C> {
    client: Arc<C>,
}

impl<C> Clone for LocalBackendService<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: InferenceClient + 'static> LocalBackendService<C> {
    /// Creates a service around `client`.
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: InferenceClient + 'static> LlmBackend for LocalBackendService<C> {
    #[instrument(
        skip_all,
        fields(
            provider = self.client.provider_name(),
            model = %config.name,
            n = config.parameters.n,
            notify_on_prompt_result = notify_on_prompt_result,
            notify_on_token = notify_on_token
        )
    )]
    async fn generate_text(
        &self,
        prompt: String,
        request: Arc<GenerationRequest>,
        config: Arc<BackendConfig>,
        mapper: ChoiceMapper,
        notify_on_prompt_result: bool,
        notify_on_token: bool,
    ) -> Result<GenerateTextChannels, BackendError> {
        let (bundle_tx, bundle_rx) = result_channel();
        let (completion_tx, completions) = optional_channel(notify_on_prompt_result);
        let (token_tx, tokens) = optional_channel(notify_on_token);

        let input = InferenceInput::text(prompt.clone()).with_images(request.images());
        let options = PredictOptions::from_config(&config, &input);
        let client = Arc::clone(&self.client);
        let completions_wanted = config.parameters.n.max(1);

        tokio::spawn(async move {
            let cancel = request.cancellation().clone();
            let mut usage = TokenUsage::default();
            let mut choices = Vec::with_capacity(completions_wanted as usize);

            for completion_index in 0..completions_wanted {
                if cancel.is_cancelled() {
                    debug!(completion_index, "Request cancelled, skipping remaining completions");
                    break;
                }

                let result = match &token_tx {
                    Some(token_tx) => stream_completion(&*client, &options, token_tx, &cancel).await,
                    None => client.predict(&options).await,
                };

                let mut response = match result {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(completion_index, error = %e, "Completion failed");
                        if let Some(tx) = &completion_tx {
                            let _ = tx.send(Err(e.clone().into())).await;
                        }
                        let _ = bundle_tx.send(Err(e.into())).await;
                        return;
                    }
                };

                response.response = finetune(&config.finetune, &prompt, &response.response);
                usage += response.usage;
                choices.push(mapper(&response));

                if let Some(tx) = &completion_tx {
                    if !cancel.is_cancelled() && tx.send(Ok(response)).await.is_err() {
                        debug!(completion_index, "Completion receiver closed");
                    }
                }
            }

            debug!(
                choice_count = choices.len(),
                prompt_tokens = usage.prompt,
                completion_tokens = usage.completion,
                "Prompt bundle ready"
            );
            if bundle_tx
                .send(Ok(PromptBundle::new(usage, choices)))
                .await
                .is_err()
            {
                debug!("Bundle receiver closed");
            }
        });

        Ok(GenerateTextChannels {
            bundle: bundle_rx,
            completions,
            tokens,
        })
    }

    #[instrument(
        skip_all,
        fields(provider = self.client.provider_name(), model = %config.name, tokenize = tokenize)
    )]
    async fn inference(
        &self,
        cancel: CancellationToken,
        input: InferenceInput,
        config: &BackendConfig,
        tokenize: bool,
    ) -> Result<InferenceHandle, BackendError> {
        let (tx, results) = result_channel();
        let client = Arc::clone(&self.client);
        let options = PredictOptions::from_config(config, &input);
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let result = if tokenize {
                client
                    .tokenize(&input.text)
                    .await
                    .map(|count| LlmResponse::new("", TokenUsage::new(count, 0)))
            } else {
                client.predict(&options).await
            };

            if task_cancel.is_cancelled() {
                debug!("Inference cancelled, discarding result");
                return;
            }
            let _ = tx.send(result.map_err(Into::into)).await;
        });

        Ok(InferenceHandle { results, cancel })
    }

    fn finetune(&self, config: &BackendConfig, prompt: &str, reply: &str) -> String {
        finetune(&config.finetune, prompt, reply)
    }
}

fn optional_channel<T>(
    wanted: bool,
) -> (
    Option<ResultSender<T>>,
    Option<switchboard_channels::ResultReceiver<T>>,
) {
    if wanted {
        let (tx, rx) = result_channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    }
}

/// Runs one streamed completion, forwarding tokens until cancelled.
///
/// The backend call always runs to the end; cancellation only stops
/// forwarding.
async fn stream_completion<C: InferenceClient + ?Sized>(
    client: &C,
    options: &PredictOptions,
    token_tx: &ResultSender<LlmResponse>,
    cancel: &CancellationToken,
) -> Result<LlmResponse, BackendError> {
    let (raw_tx, mut raw_rx) = mpsc::channel::<String>(1);

    let forward = async {
        let mut forwarded = 0u64;
        let mut forwarding = true;
        while let Some(token) = raw_rx.recv().await {
            if !forwarding || cancel.is_cancelled() {
                forwarding = false;
                continue;
            }
            forwarded += 1;
            let item = Ok(LlmResponse::new(token, TokenUsage::new(0, forwarded)));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(forwarded, "Cancelled, no longer forwarding tokens");
                    forwarding = false;
                }
                sent = token_tx.send(item) => {
                    if sent.is_err() {
                        forwarding = false;
                    }
                }
            }
        }
    };

    let (result, ()) = tokio::join!(client.predict_stream(options, raw_tx), forward);
    result
}
