//! Per-model backend configuration.

use crate::ToolChoice;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Template names used when rendering prompts for a model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Whole-conversation template for chat
    pub chat: Option<String>,
    /// Per-message template for chat
    pub chat_message: Option<String>,
    /// Whole-conversation template used when function calling is active
    pub functions: Option<String>,
    /// Template for completion prompts
    pub completion: Option<String>,
    /// Template for edit prompts
    pub edit: Option<String>,
}

/// Function-calling settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionsConfig {
    /// Do not offer the implicit no-action function
    pub disable_no_action: bool,
    /// Custom name for the no-action function
    pub no_action_function_name: Option<String>,
    /// Custom description for the no-action function
    pub no_action_description_name: Option<String>,
    /// Let the model emit an array of calls
    pub parallel_calls: bool,
}

impl FunctionsConfig {
    /// Default name of the no-action function.
    pub const DEFAULT_NO_ACTION_NAME: &'static str = "answer";
    /// Default description of the no-action function.
    pub const DEFAULT_NO_ACTION_DESCRIPTION: &'static str =
        "use this action to answer without performing any action";

    /// Effective no-action function name.
    pub fn no_action_name(&self) -> &str {
        self.no_action_function_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(Self::DEFAULT_NO_ACTION_NAME)
    }

    /// Effective no-action function description.
    pub fn no_action_description(&self) -> &str {
        self.no_action_description_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(Self::DEFAULT_NO_ACTION_DESCRIPTION)
    }
}

/// Post-processing applied to a raw backend reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinetuneConfig {
    /// Prepend the prompt to the reply
    pub echo: bool,
    /// Regexes whose matches are removed
    pub cutstrings: Vec<String>,
    /// Regex whose first capture group replaces the reply
    pub extract_regex: Option<String>,
    /// Prefixes trimmed before trimming whitespace
    pub trim_space: Vec<String>,
    /// Suffixes trimmed after trimming whitespace
    pub trim_suffix: Vec<String>,
}

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    /// Completions per prompt
    pub n: u32,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Stop sequences
    pub stop: Vec<String>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            n: 1,
            max_tokens: None,
            temperature: None,
            stop: Vec::new(),
        }
    }
}

/// Resolved per-model settings.
///
/// Loaded from a model's TOML file and layered with request overrides.
/// Read-only once resolution is finished; the orchestrator shares it
/// behind an `Arc`.
///
/// # Examples
///
/// ```
/// use switchboard_core::BackendConfig;
///
/// let config = BackendConfig::for_model("llama");
/// assert_eq!(config.name, "llama");
/// assert!(config.should_use_functions());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Model identifier callers use
    pub name: String,
    /// Model file name; also the stem of an associated `.tmpl` file
    pub model: String,
    /// Backend implementation hint
    pub backend: Option<String>,
    /// Default system prompt
    pub system_prompt: String,
    /// Prompt templates
    pub template: TemplateConfig,
    /// Role to prompt-prefix mapping
    pub roles: HashMap<String, String>,
    /// Function-calling settings
    pub function: FunctionsConfig,
    /// Sampling parameters
    pub parameters: GenerationParameters,
    /// Reply post-processing
    pub finetune: FinetuneConfig,
    /// Grammar installed for this call
    #[serde(skip)]
    pub grammar: Option<String>,
    /// Prompt strings for the completion/edit path
    #[serde(skip)]
    pub prompt_strings: Vec<String>,
    /// Tool choice carried over from the request
    #[serde(skip)]
    pub function_call: ToolChoice,
}

impl BackendConfig {
    /// Default configuration for a model with no config file.
    pub fn for_model(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            model: name.clone(),
            name,
            ..Self::default()
        }
    }

    /// Whether function calling may be used for this call.
    pub fn should_use_functions(&self) -> bool {
        self.function_call != ToolChoice::None
    }

    /// Function the request pinned, if any.
    pub fn function_to_call(&self) -> Option<&str> {
        match &self.function_call {
            ToolChoice::Function(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Prefix configured for a role key.
    pub fn role_prefix(&self, role: &str) -> Option<&str> {
        self.roles
            .get(role)
            .map(String::as_str)
            .filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_toml() {
        let config: BackendConfig = toml::from_str(
            r#"
            name = "hermes"
            model = "hermes-2-pro.gguf"
            system_prompt = "You are helpful."

            [template]
            chat = "chatml"
            chat_message = "chatml-message"

            [roles]
            user = "USER: "
            assistant = "ASSISTANT: "

            [function]
            parallel_calls = true
            no_action_function_name = "reply"

            [parameters]
            n = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.template.chat.as_deref(), Some("chatml"));
        assert_eq!(config.role_prefix("user"), Some("USER: "));
        assert_eq!(config.role_prefix("system"), None);
        assert!(config.function.parallel_calls);
        assert_eq!(config.function.no_action_name(), "reply");
        assert_eq!(config.parameters.n, 2);
        assert!(config.grammar.is_none());
    }

    #[test]
    fn test_function_choice() {
        let mut config = BackendConfig::for_model("m");
        assert_eq!(config.function.no_action_name(), "answer");
        assert!(config.function_to_call().is_none());

        config.function_call = ToolChoice::Function("get_time".into());
        assert_eq!(config.function_to_call(), Some("get_time"));
        assert!(config.should_use_functions());

        config.function_call = ToolChoice::None;
        assert!(!config.should_use_functions());
    }
}
