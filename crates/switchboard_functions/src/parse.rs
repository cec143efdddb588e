//! Parsing constrained backend output into function calls.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use switchboard_core::FunctionCall;
use tracing::{debug, instrument};

static QUOTED_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""[^"\\]*(?:\\[\s\S][^"\\]*)*""#).expect("quoted string pattern is valid")
});

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]").expect("line break pattern is valid"));

/// Escapes raw line breaks inside JSON string literals.
///
/// Constrained backends may emit literal newlines inside string values,
/// which strict JSON rejects. Line breaks between tokens are left alone.
///
/// # Examples
///
/// ```
/// use switchboard_functions::escape_newlines;
///
/// assert_eq!(
///     escape_newlines("{\"a\":\n\"x\ny\"}"),
///     "{\"a\":\n\"x\\ny\"}"
/// );
/// ```
pub fn escape_newlines(text: &str) -> String {
    QUOTED_STRING
        .replace_all(text, |caps: &regex::Captures<'_>| {
            LINE_BREAK.replace_all(&caps[0], "\\n").into_owned()
        })
        .into_owned()
}

/// Something in the backend output that could not become a call.
///
/// Warnings never fail a request; they are reported next to the calls that
/// did parse.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ParseWarning {
    /// The output is not JSON
    #[display("Output is not valid JSON: {}", _0)]
    InvalidJson(String),
    /// The output is JSON of the wrong shape for the call mode
    #[display("Expected a JSON {} of calls", _0)]
    UnexpectedShape(&'static str),
    /// A call has no string `function` field
    #[display("Call {} has no function name", _0)]
    MissingFunction(usize),
    /// A call has no object `arguments` field
    #[display("Call {} has no arguments object", _0)]
    MissingArguments(usize),
}

/// Calls parsed from one backend output.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct ParsedCalls {
    /// Valid calls, in output order
    calls: Vec<FunctionCall>,
    /// Everything that was skipped
    warnings: Vec<ParseWarning>,
}

impl ParsedCalls {
    /// Consumes the result, returning the calls.
    pub fn into_calls(self) -> Vec<FunctionCall> {
        self.calls
    }

    /// Whether no valid call was found.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Parses constrained output into function calls.
///
/// A single object is expected, or an array of objects with
/// `parallel_calls`. Each object needs a string `function` and an object
/// `arguments`; the arguments are re-serialized to compact JSON. Anything
/// else is skipped and recorded as a [`ParseWarning`], so the result may be
/// empty but is never an error.
///
/// # Examples
///
/// ```
/// use switchboard_functions::parse_function_call;
///
/// let parsed = parse_function_call(
///     r#"{"function":"get_weather","arguments":{"city":"Rome"}}"#,
///     false,
/// );
/// assert_eq!(parsed.calls().len(), 1);
/// assert_eq!(parsed.calls()[0].name, "get_weather");
/// assert_eq!(parsed.calls()[0].arguments, r#"{"city":"Rome"}"#);
///
/// let nothing = parse_function_call(r#"{"foo":"bar"}"#, false);
/// assert!(nothing.is_empty());
/// ```
#[instrument(skip(output), fields(output_len = output.len()))]
pub fn parse_function_call(output: &str, parallel_calls: bool) -> ParsedCalls {
    let mut parsed = ParsedCalls::default();
    let escaped = escape_newlines(output);

    let value: Value = match serde_json::from_str(&escaped) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, output = %escaped, "Function call output is not JSON");
            parsed.warnings.push(ParseWarning::InvalidJson(e.to_string()));
            return parsed;
        }
    };

    let candidates = match (parallel_calls, value) {
        (true, Value::Array(items)) => items,
        (false, object @ Value::Object(_)) => vec![object],
        (parallel, _) => {
            let expected = if parallel { "array" } else { "object" };
            debug!(expected, "Function call output has the wrong shape");
            parsed.warnings.push(ParseWarning::UnexpectedShape(expected));
            return parsed;
        }
    };

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(name) = candidate.get("function").and_then(Value::as_str) else {
            debug!(index, "Call has no function name, skipping");
            parsed.warnings.push(ParseWarning::MissingFunction(index));
            continue;
        };
        let Some(arguments) = candidate.get("arguments").filter(|a| a.is_object()) else {
            debug!(index, function = name, "Call has no arguments object, skipping");
            parsed.warnings.push(ParseWarning::MissingArguments(index));
            continue;
        };

        parsed
            .calls
            .push(FunctionCall::new(name, arguments.to_string()));
    }

    debug!(
        call_count = parsed.calls.len(),
        warning_count = parsed.warnings.len(),
        "Function call output parsed"
    );
    parsed
}
