//! Function and tool-call types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A callable function offered to the model.
///
/// # Examples
///
/// ```
/// use switchboard_core::FunctionDefinition;
/// use serde_json::json;
///
/// let f = FunctionDefinition::new("get_weather")
///     .with_description("Look up the weather")
///     .with_parameters(json!({"type": "object", "properties": {"city": {"type": "string"}}}));
/// assert_eq!(f.name(), "get_weather");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct FunctionDefinition {
    /// Function name
    name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    /// JSON schema of the arguments object
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    parameters: serde_json::Value,
}

impl FunctionDefinition {
    /// Creates a function with no description or parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: serde_json::Value::Null,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the parameter schema.
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A parsed function call.
///
/// `arguments` holds the raw JSON text of the arguments object, as OpenAI
/// clients expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Compact JSON arguments
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
}

impl FunctionCall {
    /// Creates a function call.
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A tool call carried in a response delta or message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    /// Position of the call in the parsed call set
    pub index: u32,
    /// Call identifier
    pub id: String,
    /// Always `"function"`
    #[serde(rename = "type")]
    pub kind: String,
    /// The call itself
    pub function: FunctionCall,
}

impl ToolCall {
    /// Creates a function tool call.
    pub fn function(index: u32, id: impl Into<String>, function: FunctionCall) -> Self {
        Self {
            index,
            id: id.into(),
            kind: "function".to_string(),
            function,
        }
    }
}

/// How the caller wants functions to be used.
///
/// Deserializes from `"auto"`, `"none"`, `{"name": ...}` and
/// `{"type": "function", "function": {"name": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ToolChoice {
    /// The model decides
    #[default]
    Auto,
    /// Functions must not be used
    None,
    /// The model must call this function
    Function(String),
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireToolChoice {
    Mode(String),
    Tool { function: WireName },
    Legacy(WireName),
}

#[derive(Deserialize)]
struct WireName {
    name: String,
}

impl<'de> Deserialize<'de> for ToolChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireToolChoice::deserialize(deserializer)? {
            WireToolChoice::Mode(mode) if mode == "none" => ToolChoice::None,
            WireToolChoice::Mode(_) => ToolChoice::Auto,
            WireToolChoice::Tool { function } => ToolChoice::Function(function.name),
            WireToolChoice::Legacy(named) => ToolChoice::Function(named.name),
        })
    }
}
