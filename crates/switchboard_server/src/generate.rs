//! Completion and Edit: one backend call per prompt, fanned in.

use crate::service::failed_channels;
use crate::{OpenAIService, Orchestration, StreamOptions};
use std::sync::Arc;
use switchboard_channels::{
    ResultReceiver, merge_cancellable, reduce_results, result_channel,
};
use switchboard_core::{
    Choice, GenerationRequest, LlmResponse, ObjectKind, PromptBundle, PromptTemplateData,
    Response, TemplateKind, TraceId,
};
use switchboard_error::{BackendError, SwitchboardResult};
use switchboard_functions::JSON_BNF;
use switchboard_interface::{ChoiceMapper, GenerateTextChannels};
use switchboard_prompt::{completion_template_name, render_prompt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

impl OpenAIService {
    /// Runs a completion request: every prompt string is generated
    /// independently and the results are folded into one response.
    ///
    /// Choices appear in the order prompts finish, each indexed by the
    /// prompt it came from.
    #[instrument(skip_all, fields(model = %request.model(), prompt_count = request.prompts().len()))]
    pub async fn completion(
        &self,
        request: GenerationRequest,
        options: StreamOptions,
    ) -> SwitchboardResult<Orchestration> {
        self.generate_from_prompts(request, TemplateKind::Completion, options)
            .await
    }

    /// Runs an edit request. Like [`completion`](Self::completion), with the
    /// request's instruction handed to the edit template.
    #[instrument(skip_all, fields(model = %request.model(), prompt_count = request.prompts().len()))]
    pub async fn edit(
        &self,
        request: GenerationRequest,
        options: StreamOptions,
    ) -> SwitchboardResult<Orchestration> {
        self.generate_from_prompts(request, TemplateKind::Edit, options)
            .await
    }

    async fn generate_from_prompts(
        &self,
        request: GenerationRequest,
        kind: TemplateKind,
        options: StreamOptions,
    ) -> SwitchboardResult<Orchestration> {
        let trace = TraceId::new();
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        let endpoint = match kind {
            TemplateKind::Edit => "edit",
            _ => "completion",
        };

        let mut config = self.resolver.resolve(&request)?;
        if request.wants_json_object() {
            debug!(trace_id = %trace, "Installing JSON object grammar");
            config.grammar = Some(JSON_BNF.to_string());
        }
        if *request.stream() && config.prompt_strings.len() > 1 {
            warn!(
                trace_id = %trace,
                prompt_count = config.prompt_strings.len(),
                "Streaming with several prompts interleaves their tokens"
            );
        }

        #[cfg(feature = "metrics")]
        self.metrics
            .record_request(endpoint, config.prompt_strings.len() as u64);

        let object = match kind {
            TemplateKind::Edit => ObjectKind::Edit,
            _ => ObjectKind::TextCompletion,
        };
        let template = completion_template_name(&config, kind, self.templates.as_ref());
        let common = PromptTemplateData {
            system_prompt: config.system_prompt.clone(),
            instruction: match kind {
                TemplateKind::Edit => request.instruction().clone().unwrap_or_default(),
                _ => String::new(),
            },
            ..PromptTemplateData::default()
        };

        let prompts = config.prompt_strings.clone();
        let request = Arc::new(request);
        let config = Arc::new(config);
        let registered = Arc::new(Mutex::new(Vec::with_capacity(prompts.len())));

        let mut units = JoinSet::new();
        for (prompt_index, prompt) in prompts.into_iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            let templates = Arc::clone(&self.templates);
            let request = Arc::clone(&request);
            let config = Arc::clone(&config);
            let registered = Arc::clone(&registered);
            let template = template.clone();
            let data = PromptTemplateData {
                input: prompt,
                ..common.clone()
            };

            units.spawn(async move {
                let prompt = render_prompt(templates.as_ref(), kind, template.as_deref(), &data);
                debug!(prompt_index, prompt = %prompt, "Prompt ready");

                let channels = match backend
                    .generate_text(
                        prompt,
                        request,
                        config,
                        choice_mapper(prompt_index as u32),
                        options.notify_on_prompt_result,
                        options.notify_on_token,
                    )
                    .await
                {
                    Ok(channels) => channels,
                    Err(e) => {
                        warn!(prompt_index, error = %e, "Backend call could not start");
                        failed_channels(e)
                    }
                };
                registered.lock().await.push(channels);
            });
        }

        // Fan-in starts only once every unit has registered its channels.
        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                error!(trace_id = %trace, error = %e, "Prompt unit failed");
                registered.lock().await.push(failed_channels(BackendError::inference(
                    format!("Prompt unit failed: {}", e),
                )));
            }
        }
        let units: Vec<GenerateTextChannels> = std::mem::take(&mut *registered.lock().await);
        debug!(trace_id = %trace, unit_count = units.len(), "All prompt units registered");

        let mut bundles = Vec::with_capacity(units.len());
        let mut completion_sources = Vec::new();
        let mut token_sources = Vec::new();
        for unit in units {
            bundles.push(unit.bundle);
            completion_sources.extend(unit.completions);
            token_sources.extend(unit.tokens);
        }

        let cancel = request.cancellation().clone();
        let completions = options
            .notify_on_prompt_result
            .then(|| fan_in(completion_sources, cancel.clone()));
        let tokens = options
            .notify_on_token
            .then(|| fan_in(token_sources, cancel.clone()));

        let (bundles, prompt_results) = if options.notify_on_prompt_result {
            observe_bundles(bundles)
        } else {
            (bundles, Vec::new())
        };

        let (result_tx, results) = result_channel();
        let seed = Response::new(&trace, request.model(), object);
        let reducer = reduce_results(
            bundles,
            result_tx,
            |mut response: Response, bundle: PromptBundle| {
                response.absorb(bundle);
                response
            },
            seed,
            true,
        );

        #[cfg(feature = "metrics")]
        {
            let metrics = self.metrics.clone();
            tokio::spawn(async move {
                let _ = reducer.await;
                metrics.record_duration(endpoint, started.elapsed());
            });
        }
        #[cfg(not(feature = "metrics"))]
        drop(reducer);

        debug!(trace_id = %trace, endpoint, "Fan-in started");
        Ok(Orchestration {
            trace,
            results,
            prompt_results,
            completions,
            tokens,
        })
    }
}

fn choice_mapper(prompt_index: u32) -> ChoiceMapper {
    Arc::new(move |response: &LlmResponse| {
        Choice::completion(prompt_index, response.response.clone()).with_finish_reason("stop")
    })
}

fn fan_in(
    sources: Vec<ResultReceiver<LlmResponse>>,
    cancel: tokio_util::sync::CancellationToken,
) -> ResultReceiver<LlmResponse> {
    let (tx, rx) = result_channel();
    merge_cancellable(sources, tx, true, cancel);
    rx
}

/// Splits every bundle channel in two: one feeds the reducer, the other is
/// handed to the caller.
///
/// A bundle channel carries one item, so the caller copy always fits in its
/// buffer and never waits on the caller. The two receivers can be drained
/// in any order.
fn observe_bundles(
    bundles: Vec<ResultReceiver<PromptBundle>>,
) -> (Vec<ResultReceiver<PromptBundle>>, Vec<ResultReceiver<PromptBundle>>) {
    let mut reduced = Vec::with_capacity(bundles.len());
    let mut observed = Vec::with_capacity(bundles.len());

    for mut source in bundles {
        let (reduce_tx, reduce_rx) = result_channel();
        let (observe_tx, observe_rx) = result_channel();
        reduced.push(reduce_rx);
        observed.push(observe_rx);

        tokio::spawn(async move {
            while let Some(item) = source.recv().await {
                if let Err(e) = observe_tx.try_send(item.clone()) {
                    debug!(error = %e, "Prompt result not delivered to caller");
                }
                if reduce_tx.send(item).await.is_err() {
                    debug!("Reducer gone, stopping bundle relay");
                    break;
                }
            }
        });
    }

    (reduced, observed)
}
