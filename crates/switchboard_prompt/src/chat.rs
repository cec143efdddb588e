//! Chat history assembly.

use crate::model_template_file;
use switchboard_core::{
    BackendConfig, ChatMessage, ChatMessageTemplateData, FunctionDefinition, PromptTemplateData,
    Role, TemplateKind,
};
use switchboard_interface::PromptTemplates;
use tracing::{debug, instrument, warn};

/// An assembled chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    /// Text sent to the backend
    pub prompt: String,
    /// A system message in the history replaced the config system prompt
    pub suppress_system_prompt: bool,
    /// Whole-conversation template that was applied, if any
    pub template: Option<String>,
}

/// Whole-conversation template for a chat.
///
/// Starts from a `.tmpl` file named after the model, then lets the
/// configured chat template replace it. When tool use is active the
/// functions template takes priority over both.
pub fn chat_template_name(
    config: &BackendConfig,
    templates: &dyn PromptTemplates,
    tools_active: bool,
) -> Option<String> {
    let mut template = None;

    if !config.model.is_empty() && templates.exists_in_model_path(&model_template_file(&config.model))
    {
        template = Some(config.model.clone());
    }

    let configured = if tools_active {
        config.template.functions.as_deref()
    } else {
        config.template.chat.as_deref()
    };
    if let Some(name) = configured.filter(|n| !n.is_empty()) {
        template = Some(name.to_string());
    }

    template
}

/// Assembles a chat history into one prompt.
///
/// Each message is rendered through the model's per-message template when
/// one is configured; an empty rendering drops the message. Otherwise the
/// role prefix is prepended to the content and any function-call payload is
/// appended as JSON. A system message rendered this second way suppresses
/// the config system prompt; one rendered by the message template does
/// not. Rendered messages are joined with newlines and passed through the
/// whole-conversation template.
///
/// `functions` is `Some` when tool use is active for this call; it selects
/// the functions template and is handed to it.
#[instrument(
    skip_all,
    fields(model = %config.name, message_count = messages.len(), tools_active = functions.is_some())
)]
pub fn assemble_chat(
    templates: &dyn PromptTemplates,
    config: &BackendConfig,
    messages: &[ChatMessage],
    functions: Option<&[FunctionDefinition]>,
) -> ChatPrompt {
    let message_template = config
        .template
        .chat_message
        .as_deref()
        .filter(|t| !t.is_empty());

    let mut suppress_system_prompt = false;
    let mut lines = Vec::with_capacity(messages.len());

    for (message_index, message) in messages.iter().enumerate() {
        let role = message_role(config, message);
        let prefix = config.role_prefix(role).unwrap_or_default();
        let text = message.text();

        let mut content = String::new();
        if let Some(template) = message_template {
            let data = ChatMessageTemplateData {
                system_prompt: config.system_prompt.clone(),
                role: prefix.to_string(),
                role_name: role.to_string(),
                content: text.unwrap_or_default().to_string(),
                function_name: message.name().clone().unwrap_or_default(),
                message_index,
            };
            match templates.evaluate_template_for_chat_message(template, &data) {
                Ok(rendered) if rendered.is_empty() => {
                    warn!(template, message_index, "Message template produced no output, skipping message");
                    continue;
                }
                Ok(rendered) => content = rendered,
                Err(e) => {
                    warn!(template, message_index, error = %e, "Message template failed, using role prefix");
                }
            }
        }

        if content.is_empty() {
            content = prefixed_content(prefix, text, message.function_call().as_ref());
            // Only a system message printed outside the message template
            // replaces the config system prompt.
            if text.is_some() && role == Role::System.as_str() {
                suppress_system_prompt = true;
            }
        }

        lines.push(content);
    }

    let input = lines.join("\n");
    debug!(prompt = %input, "Chat prompt before templating");

    let template = chat_template_name(config, templates, functions.is_some());
    let mut prompt = input.clone();
    if let Some(name) = template.as_deref() {
        let data = PromptTemplateData {
            system_prompt: config.system_prompt.clone(),
            suppress_system_prompt,
            input,
            instruction: String::new(),
            functions: functions.map(<[_]>::to_vec).unwrap_or_default(),
        };
        match templates.evaluate_template_for_prompt(TemplateKind::Chat, name, &data) {
            Ok(rendered) => {
                debug!(template = name, "Chat template applied");
                prompt = rendered;
            }
            Err(e) => debug!(template = name, error = %e, "Chat template failed, using raw history"),
        }
    }

    ChatPrompt {
        prompt,
        suppress_system_prompt,
        template,
    }
}

/// Role key used to look up a message's prefix.
///
/// An assistant message carrying a function call uses the synthetic
/// function-call role when the model maps it.
fn message_role<'a>(config: &BackendConfig, message: &'a ChatMessage) -> &'a str {
    if message.function_call().is_some()
        && *message.role() == Role::Assistant
        && config.role_prefix(Role::ASSISTANT_FUNCTION_CALL).is_some()
    {
        return Role::ASSISTANT_FUNCTION_CALL;
    }
    message.role().as_str()
}

fn prefixed_content(
    prefix: &str,
    text: Option<&str>,
    function_call: Option<&serde_json::Value>,
) -> String {
    let mut content = text
        .map(|t| format!("{}{}", prefix, t))
        .unwrap_or_default();

    let Some(call) = function_call else {
        return content;
    };
    let json = match serde_json::to_string(call) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Could not serialize function call payload");
            return content;
        }
    };

    let call_line = if prefix.is_empty() {
        json
    } else {
        format!("{} {}", prefix, json)
    };
    if content.is_empty() {
        call_line
    } else {
        content.push('\n');
        content.push_str(&call_line);
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefixed_content_variants() {
        assert_eq!(prefixed_content("USER: ", Some("hi"), None), "USER: hi");
        assert_eq!(prefixed_content("", Some("hi"), None), "hi");
        assert_eq!(prefixed_content("", None, None), "");

        let call = json!({"name": "f"});
        assert_eq!(
            prefixed_content("A:", Some("ok"), Some(&call)),
            "A:ok\nA: {\"name\":\"f\"}"
        );
        assert_eq!(prefixed_content("", None, Some(&call)), "{\"name\":\"f\"}");
    }
}
