//! Generation request type.

use crate::{ChatMessage, FunctionDefinition, ToolChoice};
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;

/// Requested shape of the response body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct ResponseFormat {
    /// `"text"` or `"json_object"`
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ResponseFormat {
    /// Format that forces a JSON object reply.
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }

    /// Whether a JSON object reply was requested.
    pub fn is_json_object(&self) -> bool {
        self.kind == "json_object"
    }
}

/// One orchestration call: a chat history or a set of raw prompts, plus the
/// function and sampling options that go with it.
///
/// Read-only for the duration of the call. The cancellation handle is shared
/// with every unit the call fans out to.
///
/// Deserializes from an OpenAI request body (`prompt` may be a string or an
/// array, `tools` and legacy `functions` are merged).
///
/// # Examples
///
/// ```
/// use switchboard_core::{ChatMessage, GenerationRequest};
///
/// let request = GenerationRequest::builder()
///     .model("llama")
///     .messages(vec![ChatMessage::user("Hi")])
///     .build()
///     .unwrap();
///
/// assert_eq!(request.model(), "llama");
/// assert!(!request.is_cancelled());
/// ```
#[derive(Debug, Clone, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Model identifier
    model: String,
    /// Chat history (chat path)
    #[builder(default)]
    messages: Vec<ChatMessage>,
    /// Raw prompt strings (completion/edit path)
    #[builder(default)]
    prompts: Vec<String>,
    /// Edit instruction
    #[builder(default)]
    instruction: Option<String>,
    /// Whether the caller streams the response
    #[builder(default)]
    stream: bool,
    /// Functions the model may call
    #[builder(default)]
    functions: Vec<FunctionDefinition>,
    /// Functions arrived as `tools` rather than legacy `functions`
    #[builder(default)]
    uses_tools: bool,
    /// How functions should be used
    #[builder(default)]
    tool_choice: ToolChoice,
    /// Raw grammar forwarded to the backend untouched
    #[builder(default)]
    grammar: Option<String>,
    /// Pre-built function set that activates constrained function calling
    #[builder(default)]
    grammar_functions: Option<Vec<FunctionDefinition>>,
    /// Requested response format
    #[builder(default)]
    response_format: Option<ResponseFormat>,
    /// Completions per prompt
    #[builder(default)]
    n: Option<u32>,
    /// Maximum tokens to generate
    #[builder(default)]
    max_tokens: Option<u32>,
    /// Sampling temperature
    #[builder(default)]
    temperature: Option<f32>,
    /// Stop sequences
    #[builder(default)]
    stop: Vec<String>,
    /// Cancellation handle shared by every unit of this call
    #[builder(default)]
    cancellation: CancellationToken,
}

impl GenerationRequest {
    /// Returns a builder for constructing a GenerationRequest.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Request cancellation of every unit working on this call.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Whether a JSON object reply was requested.
    pub fn wants_json_object(&self) -> bool {
        self.response_format
            .as_ref()
            .is_some_and(ResponseFormat::is_json_object)
    }

    /// Images attached to any message, in message order.
    pub fn images(&self) -> Vec<String> {
        self.messages
            .iter()
            .flat_map(|m| m.images().iter().cloned())
            .collect()
    }
}

#[derive(Deserialize)]
struct WireGenerationRequest {
    #[serde(default)]
    model: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "string_or_seq")]
    prompt: Vec<String>,
    #[serde(default, alias = "input")]
    instruction: Option<String>,
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    functions: Vec<FunctionDefinition>,
    #[serde(default)]
    tools: Vec<WireTool>,
    #[serde(default)]
    tool_choice: Option<ToolChoice>,
    #[serde(default)]
    function_call: Option<ToolChoice>,
    #[serde(default)]
    grammar: Option<String>,
    #[serde(default)]
    grammar_json_functions: Option<Vec<FunctionDefinition>>,
    #[serde(default)]
    response_format: Option<ResponseFormat>,
    #[serde(default)]
    n: Option<u32>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default, deserialize_with = "string_or_seq")]
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct WireTool {
    function: FunctionDefinition,
}

fn string_or_seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

impl<'de> Deserialize<'de> for GenerationRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireGenerationRequest::deserialize(deserializer)?;

        let uses_tools = !wire.tools.is_empty();
        let mut functions = wire.functions;
        functions.extend(wire.tools.into_iter().map(|t| t.function));

        Ok(Self {
            model: wire.model,
            messages: wire.messages,
            prompts: wire.prompt,
            instruction: wire.instruction,
            stream: wire.stream,
            functions,
            uses_tools,
            tool_choice: wire.tool_choice.or(wire.function_call).unwrap_or_default(),
            grammar: wire.grammar,
            grammar_functions: wire.grammar_json_functions,
            response_format: wire.response_format,
            n: wire.n,
            max_tokens: wire.max_tokens,
            temperature: wire.temperature,
            stop: wire.stop,
            cancellation: CancellationToken::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_accepts_string_or_array() {
        let single: GenerationRequest =
            serde_json::from_str(r#"{"model":"m","prompt":"Hello"}"#).unwrap();
        assert_eq!(single.prompts(), &vec!["Hello".to_string()]);

        let many: GenerationRequest =
            serde_json::from_str(r#"{"model":"m","prompt":["Hello","World"]}"#).unwrap();
        assert_eq!(many.prompts().len(), 2);
    }

    #[test]
    fn test_tools_and_functions_are_merged() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{
                "model": "m",
                "messages": [{"role": "user", "content": "time?"}],
                "functions": [{"name": "a"}],
                "tools": [{"type": "function", "function": {"name": "b"}}],
                "tool_choice": "none"
            }"#,
        )
        .unwrap();
        let names: Vec<_> = request.functions().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(*request.uses_tools());
        assert_eq!(*request.tool_choice(), ToolChoice::None);
    }

    #[test]
    fn test_json_object_response_format() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"model":"m","prompt":"x","response_format":{"type":"json_object"}}"#,
        )
        .unwrap();
        assert!(request.wants_json_object());
    }

    #[test]
    fn test_clones_share_cancellation() {
        let request = GenerationRequest::builder().model("m").build().unwrap();
        let clone = request.clone();
        request.cancel();
        assert!(clone.is_cancelled());
    }
}
