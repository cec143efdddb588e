//! Deciding what a parsed call set means.

use serde_json::Value;
use switchboard_core::{FunctionCall, ResponseMessage, ToolCall};

/// What the model asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The model chose the no-action function and wants to reply in text
    NoAction {
        /// Compact JSON arguments of the no-action call
        arguments: String,
    },
    /// The model called tools; possibly none
    ToolCalls(Vec<FunctionCall>),
}

/// Classifies parsed calls by their first entry.
///
/// # Examples
///
/// ```
/// use switchboard_core::FunctionCall;
/// use switchboard_functions::{Dispatch, classify};
///
/// let calls = vec![FunctionCall::new("answer", r#"{"message":"hi"}"#)];
/// assert!(matches!(classify(calls, "answer"), Dispatch::NoAction { .. }));
///
/// assert_eq!(classify(Vec::new(), "answer"), Dispatch::ToolCalls(Vec::new()));
/// ```
pub fn classify(calls: Vec<FunctionCall>, no_action_name: &str) -> Dispatch {
    match calls.first() {
        Some(first) if first.name == no_action_name => Dispatch::NoAction {
            arguments: first.arguments.clone(),
        },
        _ => Dispatch::ToolCalls(calls),
    }
}

/// The non-empty `message` argument of a no-action call.
pub fn no_action_message(arguments: &str) -> Option<String> {
    let arguments: Value = serde_json::from_str(arguments).ok()?;
    arguments
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Stream deltas announcing `calls`.
///
/// Each call yields two deltas sharing its index and `call_id`: the first
/// names the function, the second carries the arguments.
pub fn tool_call_deltas(calls: &[FunctionCall], call_id: &str) -> Vec<ResponseMessage> {
    calls
        .iter()
        .zip(0u32..)
        .flat_map(|(call, index)| {
            [
                ResponseMessage::tool_call(ToolCall::function(
                    index,
                    call_id,
                    FunctionCall::new(call.name.clone(), ""),
                )),
                ResponseMessage::tool_call(ToolCall::function(
                    index,
                    call_id,
                    FunctionCall::new("", call.arguments.clone()),
                )),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_action_message() {
        assert_eq!(
            no_action_message(r#"{"message":"Hello"}"#).as_deref(),
            Some("Hello")
        );
        assert_eq!(no_action_message(r#"{"message":""}"#), None);
        assert_eq!(no_action_message(r#"{}"#), None);
        assert_eq!(no_action_message(r#"{"message":3}"#), None);
        assert_eq!(no_action_message("not json"), None);
    }

    #[test]
    fn test_two_deltas_per_call() {
        let calls = vec![
            FunctionCall::new("get_time", "{}"),
            FunctionCall::new("get_weather", r#"{"city":"Rome"}"#),
        ];
        let deltas = tool_call_deltas(&calls, "trace-1");
        assert_eq!(deltas.len(), 4);

        let second_name = &deltas[2].tool_calls[0];
        assert_eq!(second_name.index, 1);
        assert_eq!(second_name.id, "trace-1");
        assert_eq!(second_name.kind, "function");
        assert_eq!(second_name.function.name, "get_weather");
        assert!(second_name.function.arguments.is_empty());

        let second_args = &deltas[3].tool_calls[0];
        assert_eq!(second_args.index, 1);
        assert!(second_args.function.name.is_empty());
        assert_eq!(second_args.function.arguments, r#"{"city":"Rome"}"#);
    }

    #[test]
    fn test_classify_only_looks_at_first_call() {
        let calls = vec![
            FunctionCall::new("get_time", "{}"),
            FunctionCall::new("answer", "{}"),
        ];
        assert_eq!(
            classify(calls.clone(), "answer"),
            Dispatch::ToolCalls(calls)
        );
    }
}
