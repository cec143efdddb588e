//! Closing chunk of a streamed chat.

use switchboard_core::{Choice, ObjectKind, Response, ResponseMessage, TraceId, Usage};

/// Finish reason for the last chunk of a streamed chat.
///
/// Tool calls announced through `tools` finish with `tool_calls`; calls to
/// legacy `functions` finish with `function_call`.
///
/// # Examples
///
/// ```
/// use switchboard_server::finish_reason_for;
///
/// assert_eq!(finish_reason_for(false, true), "stop");
/// assert_eq!(finish_reason_for(true, true), "tool_calls");
/// assert_eq!(finish_reason_for(true, false), "function_call");
/// ```
pub fn finish_reason_for(tools_called: bool, has_tools: bool) -> &'static str {
    match (tools_called, has_tools) {
        (false, _) => "stop",
        (true, true) => "tool_calls",
        (true, false) => "function_call",
    }
}

/// The empty delta chunk carrying the finish reason and final usage.
pub fn finish_chunk(trace: &TraceId, model: &str, finish_reason: &str, usage: Usage) -> Response {
    Response::new(trace, model, ObjectKind::ChatCompletionChunk)
        .with_choices(vec![
            Choice::chunk(0, ResponseMessage::content("")).with_finish_reason(finish_reason),
        ])
        .with_usage(usage)
}
