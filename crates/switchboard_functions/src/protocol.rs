//! Activation of the function-call protocol for one chat.

use crate::{build_function_set, function_grammar};
use switchboard_core::{BackendConfig, FunctionDefinition, GenerationRequest};
use switchboard_error::GrammarError;
use switchboard_interface::GrammarCompiler;
use tracing::{debug, instrument};

/// Where a chat is in the function-call protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FunctionCallState {
    /// No functions in play; output is plain text
    Disabled,
    /// Grammar installed, waiting for the backend
    AwaitingConstrainedGeneration,
    /// Backend output received, decoding calls
    ParsingResult,
    /// The model chose to answer in text
    NoActionReply,
    /// Tool calls were streamed to the caller
    ToolCallsEmitted,
}

/// Function calling switched on for a chat.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct FunctionActivation {
    /// Functions offered to the model
    functions: Vec<FunctionDefinition>,
    /// Grammar constraining the backend
    grammar: String,
    /// Name that means "answer in text"
    no_action_name: String,
    /// Output is an array of calls
    parallel_calls: bool,
}

/// Switches function calling on when the request asks for it.
///
/// Requested functions activate the protocol unless the config forbids
/// function use; the implicit no-action function is added and a pinned
/// function narrows the set. A pre-built `grammar_functions` set activates
/// it as given. Returns `Ok(None)` when the chat is plain text.
///
/// Compilation failures are returned before any backend call happens.
#[instrument(skip_all, fields(model = %config.name))]
pub fn activate(
    request: &GenerationRequest,
    config: &BackendConfig,
    compiler: &dyn GrammarCompiler,
) -> Result<Option<FunctionActivation>, GrammarError> {
    let parallel_calls = config.function.parallel_calls;

    let functions = if !request.functions().is_empty() && config.should_use_functions() {
        build_function_set(
            request.functions(),
            &config.function,
            config.function_to_call(),
        )?
    } else if let Some(functions) = request.grammar_functions().as_ref().filter(|f| !f.is_empty()) {
        functions.clone()
    } else {
        debug!(state = %FunctionCallState::Disabled, "Function calling not requested");
        return Ok(None);
    };

    let grammar = function_grammar(&functions, parallel_calls, compiler)?;
    debug!(
        state = %FunctionCallState::AwaitingConstrainedGeneration,
        function_count = functions.len(),
        parallel_calls,
        "Function-call grammar installed"
    );

    Ok(Some(FunctionActivation {
        functions,
        grammar,
        no_action_name: config.function.no_action_name().to_string(),
        parallel_calls,
    }))
}
