//! Prompt assembly for the Switchboard inference gateway.
//!
//! Turns raw prompt strings or a chat history into the text a backend
//! generates from. Template failures are never fatal here: a prompt that
//! cannot be templated is used as-is.

mod chat;
mod completion;
mod store;

pub use chat::{ChatPrompt, assemble_chat, chat_template_name};
pub use completion::{completion_template_name, render_prompt};
pub use store::FileTemplates;

/// File extension of templates stored next to the model files.
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// File name of the template associated with a model.
pub fn model_template_file(model: &str) -> String {
    format!("{}.{}", model, TEMPLATE_EXTENSION)
}
