//! Data handed to prompt templates.

use crate::FunctionDefinition;
use serde::Serialize;

/// Which prompt a template renders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum TemplateKind {
    /// A completion prompt
    Completion,
    /// An edit prompt
    Edit,
    /// A whole chat conversation
    Chat,
    /// A single chat message
    ChatMessage,
}

/// Inputs for completion, edit and whole-conversation templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptTemplateData {
    /// Config-level system prompt
    pub system_prompt: String,
    /// A message-level system prompt was present; templates should skip
    /// the config-level one, e.g. `{% if not suppress_system_prompt %}`
    pub suppress_system_prompt: bool,
    /// The prompt or assembled conversation
    pub input: String,
    /// Edit instruction
    pub instruction: String,
    /// Functions offered to the model
    pub functions: Vec<FunctionDefinition>,
}

/// Inputs for a per-message chat template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatMessageTemplateData {
    /// Config-level system prompt
    pub system_prompt: String,
    /// Role prefix from the model's role mapping
    pub role: String,
    /// Role name after remapping
    pub role_name: String,
    /// Message content
    pub content: String,
    /// Function name for function/tool messages
    pub function_name: String,
    /// Position of the message in the history
    pub message_index: usize,
}
