//! Chat message types.

use crate::Role;
use serde::{Deserialize, Serialize};

/// A message in a chat history.
///
/// Accepts the OpenAI wire shapes: `content` may be a string or an array of
/// `text` / `image_url` parts. Text parts are joined into [`content`](Self::content),
/// image URLs are collected into [`images`](Self::images).
///
/// # Examples
///
/// ```
/// use switchboard_core::{ChatMessage, Role};
///
/// let message = ChatMessage::user("Hi");
///
/// assert_eq!(*message.role(), Role::User);
/// assert_eq!(message.content().as_deref(), Some("Hi"));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[serde(from = "WireChatMessage")]
#[builder(setter(into))]
pub struct ChatMessage {
    /// The role of the message sender
    role: Role,
    /// Text content, if any
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    /// Name of the function this message came from (function/tool role)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Function call payload emitted by the assistant
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<serde_json::Value>,
    /// Images attached to the message (URLs or data URIs)
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

impl ChatMessage {
    /// Creates a text message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
            images: Vec::new(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Returns a builder for constructing a ChatMessage.
    pub fn builder() -> ChatMessageBuilder {
        ChatMessageBuilder::default()
    }

    /// Content text when present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Deserialize)]
struct WireChatMessage {
    role: Role,
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    function_call: Option<serde_json::Value>,
    #[serde(default)]
    tool_calls: Option<serde_json::Value>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Deserialize)]
struct WireImageUrl {
    url: String,
}

impl From<WireChatMessage> for ChatMessage {
    fn from(wire: WireChatMessage) -> Self {
        let mut images = wire.images;
        let content = match wire.content {
            None => None,
            Some(WireContent::Text(text)) => Some(text),
            Some(WireContent::Parts(parts)) => {
                let mut texts = Vec::new();
                for part in parts {
                    match part {
                        WirePart::Text { text } => texts.push(text),
                        WirePart::ImageUrl { image_url } => images.push(image_url.url),
                    }
                }
                Some(texts.join("\n"))
            }
        };

        Self {
            role: wire.role,
            content,
            name: wire.name,
            function_call: wire.function_call.or(wire.tool_calls),
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_string_content() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"Hello"}"#).unwrap();
        assert_eq!(message.text(), Some("Hello"));
        assert!(message.images().is_empty());
    }

    #[test]
    fn test_deserialize_parts_collects_images() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role":"user","content":[
                {"type":"text","text":"What is this?"},
                {"type":"image_url","image_url":{"url":"data:image/png;base64,AAAA"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(message.text(), Some("What is this?"));
        assert_eq!(message.images(), &vec!["data:image/png;base64,AAAA".to_string()]);
    }

    #[test]
    fn test_deserialize_function_call_without_content() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role":"assistant","content":null,"function_call":{"name":"get_time","arguments":"{}"}}"#,
        )
        .unwrap();
        assert_eq!(*message.role(), Role::Assistant);
        assert!(message.text().is_none());
        assert!(message.function_call().is_some());
    }

    #[test]
    fn test_deserialize_unlisted_role() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"developer","content":"Be brief"}"#).unwrap();
        assert_eq!(*message.role(), Role::Other("developer".to_string()));
        assert_eq!(message.role().as_str(), "developer");
    }
}
