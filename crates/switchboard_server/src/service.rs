//! The orchestration service and what its entry points return.

#[cfg(feature = "metrics")]
use crate::OrchestrationMetrics;
use std::sync::Arc;
use switchboard_channels::{ResultReceiver, result_channel};
use switchboard_core::{LlmResponse, PromptBundle, Response, TraceId};
use switchboard_error::BackendError;
use switchboard_functions::GbnfCompiler;
use switchboard_interface::{
    ConfigResolver, GenerateTextChannels, GrammarCompiler, LlmBackend, PromptTemplates,
};

/// Which notification channels a caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StreamOptions {
    /// Receive each completion, and each prompt's bundle, as it finishes
    pub notify_on_prompt_result: bool,
    /// Receive each token as it is generated
    pub notify_on_token: bool,
}

impl StreamOptions {
    /// Only the final result.
    pub fn none() -> Self {
        Self::default()
    }

    /// The final result plus every token.
    pub fn tokens() -> Self {
        Self {
            notify_on_token: true,
            ..Self::default()
        }
    }
}

/// Channels for one running orchestration call.
///
/// The result, completion and token channels must be drained (or dropped)
/// for the call to make progress; sends block until received. Per-prompt
/// results are buffered and can be read at any point.
#[derive(Debug)]
pub struct Orchestration {
    /// Correlation id stamped on every emitted response
    pub trace: TraceId,
    /// Final response, or the stream of chat chunks
    pub results: ResultReceiver<Response>,
    /// One bundle per fanned-out prompt, when prompt results were requested
    pub prompt_results: Vec<ResultReceiver<PromptBundle>>,
    /// Every completion, when prompt results were requested
    pub completions: Option<ResultReceiver<LlmResponse>>,
    /// Every token, when tokens were requested
    pub tokens: Option<ResultReceiver<LlmResponse>>,
}

/// OpenAI-compatible orchestration over a backend service.
///
/// Exposes Completion, Edit and Chat. Configuration errors and grammar
/// compilation errors are returned directly; everything after the backend
/// has been invoked arrives as `Err` items on the returned channels.
pub struct OpenAIService {
    pub(crate) backend: Arc<dyn LlmBackend>,
    pub(crate) templates: Arc<dyn PromptTemplates>,
    pub(crate) resolver: Arc<dyn ConfigResolver>,
    pub(crate) compiler: Arc<dyn GrammarCompiler>,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: OrchestrationMetrics,
}

impl OpenAIService {
    /// Creates a service compiling function grammars to GBNF.
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        templates: Arc<dyn PromptTemplates>,
        resolver: Arc<dyn ConfigResolver>,
    ) -> Self {
        Self {
            backend,
            templates,
            resolver,
            compiler: Arc::new(GbnfCompiler::for_function_calls()),
            #[cfg(feature = "metrics")]
            metrics: OrchestrationMetrics::new(),
        }
    }

    /// Replaces the grammar compiler.
    pub fn with_grammar_compiler(mut self, compiler: Arc<dyn GrammarCompiler>) -> Self {
        self.compiler = compiler;
        self
    }
}

impl std::fmt::Debug for OpenAIService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIService").finish_non_exhaustive()
    }
}

/// Channels standing in for a backend call that could not start.
///
/// The bundle channel holds the error, so the failure reaches the caller
/// through the ordinary fan-in path.
pub(crate) fn failed_channels(error: BackendError) -> GenerateTextChannels {
    let (tx, bundle) = result_channel();
    // A fresh channel always has room for one item.
    let _ = tx.try_send(Err(error.into()));
    GenerateTextChannels {
        bundle,
        completions: None,
        tokens: None,
    }
}
