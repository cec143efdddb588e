//! Prompt template evaluation.

use switchboard_core::{ChatMessageTemplateData, PromptTemplateData, TemplateKind};
use switchboard_error::TemplateError;

/// Evaluates named prompt templates.
pub trait PromptTemplates: Send + Sync {
    /// Renders a completion, edit or whole-conversation template.
    fn evaluate_template_for_prompt(
        &self,
        kind: TemplateKind,
        template_name: &str,
        data: &PromptTemplateData,
    ) -> Result<String, TemplateError>;

    /// Renders a per-message chat template.
    fn evaluate_template_for_chat_message(
        &self,
        template_name: &str,
        data: &ChatMessageTemplateData,
    ) -> Result<String, TemplateError>;

    /// Whether a template named `name` sits next to the model files.
    fn exists_in_model_path(&self, name: &str) -> bool;
}
