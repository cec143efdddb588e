//! OpenAI-shaped response types.

use crate::{PromptBundle, TokenUsage, ToolCall, TraceId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Value of the `object` field for each endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumString,
)]
pub enum ObjectKind {
    /// Completion endpoint
    #[strum(serialize = "text_completion")]
    TextCompletion,
    /// Edit endpoint
    #[strum(serialize = "edit")]
    Edit,
    /// Non-streamed chat
    #[strum(serialize = "chat.completion")]
    ChatCompletion,
    /// Streamed chat
    #[strum(serialize = "chat.completion.chunk")]
    ChatCompletionChunk,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Getters)]
pub struct Usage {
    /// Tokens in the prompt
    prompt_tokens: u64,
    /// Tokens in the completion
    completion_tokens: u64,
    /// Total tokens used
    total_tokens: u64,
}

impl Usage {
    /// Usage for the given prompt and completion counts.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Adds backend-reported usage, keeping the total consistent.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += usage.prompt;
        self.completion_tokens += usage.completion;
        self.total_tokens = self.prompt_tokens + self.completion_tokens;
    }
}

impl From<TokenUsage> for Usage {
    fn from(usage: TokenUsage) -> Self {
        Self::new(usage.prompt, usage.completion)
    }
}

/// Message payload of a choice, used for both `message` and `delta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResponseMessage {
    /// Role (only in the first chunk of a stream)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ResponseMessage {
    /// An assistant message with the given content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Some("assistant".to_string()),
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A content-only delta.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            role: None,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// An assistant delta carrying one tool call.
    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            role: Some("assistant".to_string()),
            content: None,
            tool_calls: vec![call],
        }
    }
}

/// A completion choice.
///
/// Exactly one of `text`, `message` or `delta` is set, depending on the
/// endpoint and whether the response is a stream chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Getters)]
pub struct Choice {
    /// Index of this choice
    index: u32,
    /// Reason why generation finished
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<String>,
    /// Completion text
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    /// Chat message
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<ResponseMessage>,
    /// Stream delta
    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<ResponseMessage>,
}

impl Choice {
    /// A completion-shaped choice.
    pub fn completion(index: u32, text: impl Into<String>) -> Self {
        Self {
            index,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A chat-shaped choice.
    pub fn chat(index: u32, message: ResponseMessage) -> Self {
        Self {
            index,
            message: Some(message),
            ..Self::default()
        }
    }

    /// A stream-chunk choice.
    pub fn chunk(index: u32, delta: ResponseMessage) -> Self {
        Self {
            index,
            delta: Some(delta),
            ..Self::default()
        }
    }

    /// Sets the finish reason.
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    /// Text carried by the choice, whichever shape it has.
    pub fn content(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or_else(|| self.message.as_ref().and_then(|m| m.content.as_deref()))
            .or_else(|| self.delta.as_ref().and_then(|d| d.content.as_deref()))
    }
}

/// OpenAI-compatible response or stream chunk.
///
/// # Examples
///
/// ```
/// use switchboard_core::{Choice, ObjectKind, Response, TraceId, Usage};
///
/// let trace = TraceId::with_id("abc", 1);
/// let response = Response::new(&trace, "llama", ObjectKind::TextCompletion)
///     .with_choices(vec![Choice::completion(0, "hi").with_finish_reason("stop")])
///     .with_usage(Usage::new(3, 1));
///
/// assert_eq!(response.id(), "abc");
/// assert_eq!(response.object(), "text_completion");
/// assert_eq!(*response.usage().total_tokens(), 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Getters)]
pub struct Response {
    /// Trace id of the call
    id: String,
    /// Unix timestamp of the call
    created: i64,
    /// Model name as the caller sent it
    model: String,
    /// Object kind
    object: String,
    /// Choices
    choices: Vec<Choice>,
    /// Token usage
    #[serde(default)]
    usage: Usage,
}

impl Response {
    /// An empty response stamped with the trace id.
    pub fn new(trace: &TraceId, model: impl Into<String>, object: ObjectKind) -> Self {
        Self {
            id: trace.id().clone(),
            created: *trace.created(),
            model: model.into(),
            object: object.to_string(),
            choices: Vec::new(),
            usage: Usage::default(),
        }
    }

    /// Sets the choices.
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    /// Sets the usage.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Folds one prompt bundle in: usage is summed, choices appended.
    pub fn absorb(&mut self, bundle: PromptBundle) {
        self.usage.add(bundle.usage());
        self.choices.extend(bundle.into_choices());
    }
}
