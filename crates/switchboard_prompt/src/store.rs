//! Jinja templates stored next to the model files.

use crate::TEMPLATE_EXTENSION;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use switchboard_core::{ChatMessageTemplateData, PromptTemplateData, TemplateKind};
use switchboard_error::{TemplateError, TemplateErrorKind};
use switchboard_interface::PromptTemplates;
use tracing::{debug, instrument, warn};

/// Template store backed by `<models_path>/<name>.tmpl` files.
///
/// Templates are Jinja2 sources rendered with minijinja against the
/// template data types, so conditionals, loops and filters such as
/// `tojson` are available. Referencing a field the data does not carry is
/// a render error. Registered templates shadow files of the same name.
///
/// # Examples
///
/// ```
/// use switchboard_core::{PromptTemplateData, TemplateKind};
/// use switchboard_interface::PromptTemplates;
/// use switchboard_prompt::FileTemplates;
///
/// let templates = FileTemplates::in_memory();
/// templates
///     .register(
///         "alpaca",
///         "{% if system_prompt %}{{ system_prompt }}\n{% endif %}### Instruction:\n{{ input }}\n### Response:",
///     )
///     .unwrap();
///
/// let data = PromptTemplateData {
///     input: "Say hi".to_string(),
///     ..Default::default()
/// };
/// let rendered = templates
///     .evaluate_template_for_prompt(TemplateKind::Completion, "alpaca", &data)
///     .unwrap();
/// assert_eq!(rendered, "### Instruction:\nSay hi\n### Response:");
/// ```
#[derive(Debug)]
pub struct FileTemplates {
    models_path: Option<PathBuf>,
    env: RwLock<Environment<'static>>,
}

impl Default for FileTemplates {
    fn default() -> Self {
        Self {
            models_path: None,
            env: RwLock::new(environment()),
        }
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    // Prompts are plain text whatever the template is called.
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

/// A template name must name a file directly inside the models directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

fn render_error(name: &str, e: minijinja::Error) -> TemplateError {
    TemplateError::new(TemplateErrorKind::Render {
        name: name.to_string(),
        message: e.to_string(),
    })
}

impl FileTemplates {
    /// Store reading templates from `models_path`.
    pub fn new(models_path: impl Into<PathBuf>) -> Self {
        Self {
            models_path: Some(models_path.into()),
            ..Self::default()
        }
    }

    /// Store holding only registered templates.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Directory templates are read from.
    pub fn models_path(&self) -> Option<&Path> {
        self.models_path.as_deref()
    }

    /// Compiles `body` and registers it under `name`.
    pub fn register(
        &self,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        self.env
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add_template_owned(name.clone(), body.into())
            .map_err(|e| render_error(&name, e))
    }

    /// Loads the source of template `name`.
    #[instrument(skip(self))]
    pub fn load(&self, name: &str) -> Result<String, TemplateError> {
        if let Ok(template) = self
            .env
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get_template(name)
        {
            return Ok(template.source().to_string());
        }

        let path = self
            .template_path(name)
            .filter(|p| p.is_file())
            .ok_or_else(|| TemplateError::new(TemplateErrorKind::NotFound(name.to_string())))?;

        debug!(path = %path.display(), "Reading template file");
        std::fs::read_to_string(&path).map_err(|e| {
            TemplateError::new(TemplateErrorKind::Read {
                name: name.to_string(),
                message: e.to_string(),
            })
        })
    }

    fn template_path(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            warn!(template = name, "Rejecting template name outside the models directory");
            return None;
        }
        self.models_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION)))
    }

    /// Compiles the file template `name` on first use.
    fn ensure_compiled(&self, name: &str) -> Result<(), TemplateError> {
        let known = self
            .env
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get_template(name)
            .is_ok();
        if known {
            return Ok(());
        }
        let body = self.load(name)?;
        self.register(name, body)
    }

    fn render<S: Serialize>(&self, name: &str, data: &S) -> Result<String, TemplateError> {
        self.ensure_compiled(name)?;
        let env = self.env.read().unwrap_or_else(|e| e.into_inner());
        let template = env.get_template(name).map_err(|e| render_error(name, e))?;
        template.render(data).map_err(|e| render_error(name, e))
    }
}

impl PromptTemplates for FileTemplates {
    fn evaluate_template_for_prompt(
        &self,
        kind: TemplateKind,
        template_name: &str,
        data: &PromptTemplateData,
    ) -> Result<String, TemplateError> {
        debug!(template = template_name, kind = %kind, "Evaluating prompt template");
        self.render(template_name, data)
    }

    fn evaluate_template_for_chat_message(
        &self,
        template_name: &str,
        data: &ChatMessageTemplateData,
    ) -> Result<String, TemplateError> {
        self.render(template_name, data)
    }

    fn exists_in_model_path(&self, name: &str) -> bool {
        if !is_plain_name(name) {
            return false;
        }
        let stem = name
            .strip_suffix(TEMPLATE_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(name);
        let registered = self
            .env
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get_template(stem)
            .is_ok();
        if registered {
            return true;
        }
        self.models_path
            .as_ref()
            .is_some_and(|dir| dir.join(name).is_file())
    }
}
