//! Function sets and their output schema.

use serde_json::{Value, json};
use switchboard_core::{FunctionDefinition, FunctionsConfig};
use switchboard_error::{GrammarError, GrammarErrorKind};
use switchboard_interface::GrammarCompiler;
use tracing::debug;

/// Description of the no-action function's `message` argument.
pub const NO_ACTION_MESSAGE_DESCRIPTION: &str = "The message to reply the user with";

/// The implicit function meaning "reply in natural language".
pub fn no_action_function(config: &FunctionsConfig) -> FunctionDefinition {
    FunctionDefinition::new(config.no_action_name())
        .with_description(config.no_action_description())
        .with_parameters(json!({
            "properties": {
                "message": {
                    "type": "string",
                    "description": NO_ACTION_MESSAGE_DESCRIPTION,
                }
            }
        }))
}

/// Functions the model may choose from.
///
/// The requested functions come first, followed by the no-action function
/// unless it is disabled. A pinned function restricts the set to that one
/// name.
///
/// # Examples
///
/// ```
/// use switchboard_core::{FunctionDefinition, FunctionsConfig};
/// use switchboard_functions::build_function_set;
///
/// let requested = vec![FunctionDefinition::new("get_weather")];
/// let set = build_function_set(&requested, &FunctionsConfig::default(), None).unwrap();
///
/// let names: Vec<_> = set.iter().map(|f| f.name().as_str()).collect();
/// assert_eq!(names, ["get_weather", "answer"]);
/// ```
pub fn build_function_set(
    requested: &[FunctionDefinition],
    config: &FunctionsConfig,
    pinned: Option<&str>,
) -> Result<Vec<FunctionDefinition>, GrammarError> {
    let mut functions = requested.to_vec();
    if !config.disable_no_action {
        functions.push(no_action_function(config));
    }

    if let Some(name) = pinned {
        functions.retain(|f| f.name() == name);
        if functions.is_empty() {
            return Err(GrammarError::new(GrammarErrorKind::UnknownFunction(
                name.to_string(),
            )));
        }
    }

    if functions.is_empty() {
        return Err(GrammarError::new(GrammarErrorKind::EmptyFunctionSet));
    }

    debug!(
        function_count = functions.len(),
        pinned = pinned.unwrap_or_default(),
        "Function set built"
    );
    Ok(functions)
}

/// JSON schema matching one call of any function in the set.
pub fn function_schema(functions: &[FunctionDefinition]) -> Value {
    let alternatives: Vec<Value> = functions
        .iter()
        .map(|f| {
            json!({
                "type": "object",
                "properties": {
                    "function": { "const": f.name() },
                    "arguments": {
                        "type": "object",
                        "properties": f.parameters().get("properties").cloned().unwrap_or(Value::Null),
                    },
                }
            })
        })
        .collect();

    json!({ "oneOf": alternatives })
}

/// Compiles the output grammar for a function set.
///
/// In parallel-call mode the grammar accepts an array of calls instead of a
/// single call.
pub fn function_grammar(
    functions: &[FunctionDefinition],
    parallel_calls: bool,
    compiler: &dyn GrammarCompiler,
) -> Result<String, GrammarError> {
    if functions.is_empty() {
        return Err(GrammarError::new(GrammarErrorKind::EmptyFunctionSet));
    }

    let call = function_schema(functions);
    let schema = if parallel_calls {
        json!({ "type": "array", "items": call })
    } else {
        call
    };

    compiler.compile(&schema)
}
