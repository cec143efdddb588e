//! Chat: one assembled prompt, one backend call, one stream of chunks.

#[cfg(feature = "metrics")]
use crate::OrchestrationMetrics;
use crate::service::failed_channels;
use crate::{OpenAIService, Orchestration, StreamOptions};
use std::sync::Arc;
use switchboard_channels::{ResultReceiver, ResultSender, result_channel};
use switchboard_core::{
    BackendConfig, Choice, GenerationRequest, GenerationResult, LlmResponse, ObjectKind,
    PromptBundle, Response, ResponseMessage, TokenUsage, TraceId, Usage,
};
use switchboard_error::{BackendError, BackendErrorKind, SwitchboardError, SwitchboardResult};
use switchboard_functions::{
    Dispatch, FunctionActivation, FunctionCallState, JSON_BNF, activate, classify,
    no_action_message, parse_function_call, tool_call_deltas,
};
use switchboard_interface::{ChoiceMapper, InferenceInput, LlmBackend};
use switchboard_prompt::assemble_chat;
use tracing::{debug, info, instrument, warn};

impl OpenAIService {
    /// Runs a chat request.
    ///
    /// The history is assembled into one prompt and generated once. Without
    /// functions, each generated choice is emitted as one response. With
    /// functions, the constrained output is parsed: a no-action call yields
    /// an empty assistant chunk followed by the reply, and tool calls yield
    /// two chunks per call.
    ///
    /// The result channel closes once every chunk has been sent.
    #[instrument(
        skip_all,
        fields(model = %request.model(), message_count = request.messages().len(), stream = request.stream())
    )]
    pub async fn chat(
        &self,
        request: GenerationRequest,
        options: StreamOptions,
    ) -> SwitchboardResult<Orchestration> {
        let trace = TraceId::new();
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let mut config = self.resolver.resolve(&request)?;
        let activation = activate(&request, &config, self.compiler.as_ref())?;

        if request.wants_json_object() {
            if activation.is_some() {
                debug!(trace_id = %trace, "Function grammar takes precedence over JSON object grammar");
            } else {
                config.grammar = Some(JSON_BNF.to_string());
            }
        }
        if let Some(activation) = &activation {
            config.grammar = Some(activation.grammar().clone());
            if *request.stream() {
                warn!(trace_id = %trace, "Streaming tokens of a function-call grammar yields raw JSON");
            }
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_request("chat", 1);

        let assembled = assemble_chat(
            self.templates.as_ref(),
            &config,
            request.messages(),
            activation.as_ref().map(|a| a.functions().as_slice()),
        );
        debug!(trace_id = %trace, prompt = %assembled.prompt, "Chat prompt assembled");

        let streaming = *request.stream();
        let request = Arc::new(request);
        let config = Arc::new(config);

        let channels = match self
            .backend
            .generate_text(
                assembled.prompt.clone(),
                Arc::clone(&request),
                Arc::clone(&config),
                chat_mapper(streaming),
                options.notify_on_prompt_result,
                options.notify_on_token,
            )
            .await
        {
            Ok(channels) => channels,
            Err(e) => {
                warn!(trace_id = %trace, error = %e, "Backend call could not start");
                failed_channels(e)
            }
        };

        let (sink, results) = result_channel();
        let turn = ChatTurn {
            backend: Arc::clone(&self.backend),
            trace: trace.clone(),
            request,
            config,
            prompt: assembled.prompt,
            activation,
            sink,
            #[cfg(feature = "metrics")]
            metrics: self.metrics.clone(),
            #[cfg(feature = "metrics")]
            started,
        };
        tokio::spawn(turn.run(channels.bundle));

        Ok(Orchestration {
            trace,
            results,
            prompt_results: Vec::new(),
            completions: channels.completions,
            tokens: channels.tokens,
        })
    }
}

/// Chat choices carry a message, or a delta when the caller streams.
fn chat_mapper(streaming: bool) -> ChoiceMapper {
    Arc::new(move |response: &LlmResponse| {
        let message = ResponseMessage::assistant(response.response.clone());
        let choice = if streaming {
            Choice::chunk(0, message)
        } else {
            Choice::chat(0, message)
        };
        choice.with_finish_reason("stop")
    })
}

/// The emitting half of one chat call.
struct ChatTurn {
    backend: Arc<dyn LlmBackend>,
    trace: TraceId,
    request: Arc<GenerationRequest>,
    config: Arc<BackendConfig>,
    prompt: String,
    activation: Option<FunctionActivation>,
    sink: ResultSender<Response>,
    #[cfg(feature = "metrics")]
    metrics: OrchestrationMetrics,
    #[cfg(feature = "metrics")]
    started: std::time::Instant,
}

impl ChatTurn {
    async fn run(self, mut bundle: ResultReceiver<PromptBundle>) {
        match bundle.recv().await {
            Some(Ok(bundle)) => self.emit_bundle(bundle).await,
            Some(Err(e)) => {
                warn!(trace_id = %self.trace, error = %e, "Chat generation failed");
                self.fail(e).await;
            }
            None if self.request.is_cancelled() => {
                debug!(trace_id = %self.trace, "Chat cancelled before a result arrived");
            }
            None => {
                self.fail(
                    BackendError::new(BackendErrorKind::Stream(
                        "backend closed without a result".to_string(),
                    ))
                    .into(),
                )
                .await;
            }
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_duration("chat", self.started.elapsed());
        debug!(trace_id = %self.trace, "Chat result channel closing");
    }

    async fn emit_bundle(&self, bundle: PromptBundle) {
        let usage = Usage::from(*bundle.usage());
        let choices = bundle.into_choices();

        if self.activation.is_some() && choices.len() > 1 {
            warn!(
                trace_id = %self.trace,
                choice_count = choices.len(),
                "Function-call chat produced several choices"
            );
        }

        for choice in choices {
            let delivered = match &self.activation {
                None => {
                    let response = self.response(self.plain_kind(), choice).with_usage(usage);
                    self.send(Ok(response)).await
                }
                Some(activation) => self.dispatch(activation, &choice, usage).await,
            };
            if !delivered {
                return;
            }
        }
    }

    fn plain_kind(&self) -> ObjectKind {
        if *self.request.stream() {
            ObjectKind::ChatCompletionChunk
        } else {
            ObjectKind::ChatCompletion
        }
    }

    fn response(&self, object: ObjectKind, choice: Choice) -> Response {
        Response::new(&self.trace, self.request.model(), object).with_choices(vec![choice])
    }

    /// Sends one item unless the request was cancelled or the caller left.
    async fn send(&self, item: GenerationResult<Response>) -> bool {
        if self.request.is_cancelled() {
            debug!(trace_id = %self.trace, "Request cancelled, no further chunks");
            return false;
        }
        if self.sink.send(item).await.is_err() {
            debug!(trace_id = %self.trace, "Result receiver dropped");
            return false;
        }
        true
    }

    async fn fail(&self, error: SwitchboardError) {
        #[cfg(feature = "metrics")]
        self.metrics.record_error("chat");
        self.send(Err(error)).await;
    }

    async fn dispatch(&self, activation: &FunctionActivation, choice: &Choice, usage: Usage) -> bool {
        debug!(trace_id = %self.trace, state = %FunctionCallState::ParsingResult, "Parsing function call");
        let parsed = parse_function_call(
            choice.content().unwrap_or_default(),
            *activation.parallel_calls(),
        );
        for warning in parsed.warnings() {
            debug!(trace_id = %self.trace, warning = %warning, "Function call output not fully understood");
        }

        match classify(parsed.into_calls(), activation.no_action_name()) {
            Dispatch::NoAction { arguments } => {
                info!(trace_id = %self.trace, state = %FunctionCallState::NoActionReply, "Model answered without calling a function");
                #[cfg(feature = "metrics")]
                self.metrics.record_no_action();

                let opening = self.response(
                    ObjectKind::ChatCompletionChunk,
                    Choice::chunk(0, ResponseMessage::assistant("")),
                );
                if !self.send(Ok(opening)).await {
                    return false;
                }

                match self.answer(&arguments).await {
                    Ok(Some((reply, extra))) => {
                        let mut usage = usage;
                        usage.add(&extra);
                        let chunk = self
                            .response(
                                ObjectKind::ChatCompletionChunk,
                                Choice::chunk(0, ResponseMessage::content(reply)),
                            )
                            .with_usage(usage);
                        self.send(Ok(chunk)).await
                    }
                    Ok(None) => false,
                    Err(e) => {
                        warn!(trace_id = %self.trace, error = %e, "Reply generation failed");
                        self.fail(e).await;
                        false
                    }
                }
            }
            Dispatch::ToolCalls(calls) => {
                info!(
                    trace_id = %self.trace,
                    state = %FunctionCallState::ToolCallsEmitted,
                    call_count = calls.len(),
                    "Model called functions"
                );
                #[cfg(feature = "metrics")]
                self.metrics.record_tool_calls(calls.len() as u64);

                for delta in tool_call_deltas(&calls, self.trace.id()) {
                    let chunk = self.response(ObjectKind::ChatCompletionChunk, Choice::chunk(0, delta));
                    if !self.send(Ok(chunk)).await {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Text reply for a no-action call.
    ///
    /// A non-empty `message` argument is used directly. Otherwise the
    /// backend is asked again, without a grammar, for a free-text reply.
    /// Returns `Ok(None)` when the extra call was cancelled.
    async fn answer(&self, arguments: &str) -> SwitchboardResult<Option<(String, TokenUsage)>> {
        if let Some(message) = no_action_message(arguments) {
            debug!(trace_id = %self.trace, "Using the reply carried by the no-action call");
            let reply = self.backend.finetune(&self.config, &self.prompt, &message);
            return Ok(Some((reply, TokenUsage::default())));
        }

        debug!(trace_id = %self.trace, "No-action call without a message, computing a reply");
        let mut config = BackendConfig::clone(&self.config);
        config.grammar = None;

        let input = InferenceInput::text(self.prompt.clone()).with_images(self.request.images());
        let mut handle = self
            .backend
            .inference(self.request.cancellation().child_token(), input, &config, false)
            .await?;

        match handle.results.recv().await {
            Some(Ok(response)) => {
                let reply = self.backend.finetune(&config, &self.prompt, &response.response);
                Ok(Some((reply, response.usage)))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
