//! Trait definitions for the collaborators the orchestrator drives.
//!
//! The orchestrator never talks to a model process, a template engine or a
//! grammar compiler directly. It goes through these traits, which keeps the
//! pipeline testable with scripted implementations.

mod backend;
mod config;
mod grammar;
mod templates;

pub use backend::{
    ChoiceMapper, GenerateTextChannels, InferenceClient, InferenceHandle, InferenceInput,
    LlmBackend, PredictOptions,
};
pub use config::ConfigResolver;
pub use grammar::GrammarCompiler;
pub use templates::PromptTemplates;
