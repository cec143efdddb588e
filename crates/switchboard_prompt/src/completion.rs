//! Completion and edit prompt rendering.

use crate::model_template_file;
use switchboard_core::{BackendConfig, PromptTemplateData, TemplateKind};
use switchboard_interface::PromptTemplates;
use tracing::{debug, warn};

/// Template used to render completion or edit prompts for a model.
///
/// A template named in the model's config wins. Otherwise a `.tmpl` file
/// named after the model file is used when one exists.
pub fn completion_template_name(
    config: &BackendConfig,
    kind: TemplateKind,
    templates: &dyn PromptTemplates,
) -> Option<String> {
    let configured = match kind {
        TemplateKind::Edit => config.template.edit.as_deref(),
        _ => config.template.completion.as_deref(),
    };

    if let Some(name) = configured.filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }

    if !config.model.is_empty() && templates.exists_in_model_path(&model_template_file(&config.model))
    {
        return Some(config.model.clone());
    }

    warn!(model = %config.name, kind = %kind, "No prompt template found, using raw prompt");
    None
}

/// Renders one prompt through `template`.
///
/// Without a template, or when evaluation fails, the untemplated input is
/// returned.
pub fn render_prompt(
    templates: &dyn PromptTemplates,
    kind: TemplateKind,
    template: Option<&str>,
    data: &PromptTemplateData,
) -> String {
    let Some(template) = template else {
        return data.input.clone();
    };

    match templates.evaluate_template_for_prompt(kind, template, data) {
        Ok(rendered) => {
            debug!(template, kind = %kind, "Template applied to prompt");
            rendered
        }
        Err(e) => {
            warn!(template, kind = %kind, error = %e, "Template failed, using raw prompt");
            data.input.clone()
        }
    }
}
