//! Core data types for the Switchboard inference gateway.
//!
//! This crate provides the value types shared by every stage of an
//! orchestration call: the request, resolved model configuration, trace id,
//! backend results and the OpenAI-shaped response.

mod bundle;
mod config;
mod function;
mod message;
mod observability;
mod request;
mod response;
mod role;
mod template;
mod trace;

pub use bundle::{LlmResponse, PromptBundle, TokenUsage};
pub use config::{
    BackendConfig, FinetuneConfig, FunctionsConfig, GenerationParameters, TemplateConfig,
};
pub use function::{FunctionCall, FunctionDefinition, ToolCall, ToolChoice};
pub use message::{ChatMessage, ChatMessageBuilder};
pub use observability::{init_observability, init_tracing, shutdown_observability};
pub use request::{GenerationRequest, GenerationRequestBuilder, ResponseFormat};
pub use response::{Choice, ObjectKind, Response, ResponseMessage, Usage};
pub use role::Role;
pub use template::{ChatMessageTemplateData, PromptTemplateData, TemplateKind};
pub use trace::TraceId;

pub use tokio_util::sync::CancellationToken;

/// The only item type placed on an orchestration channel.
///
/// Failures after fan-out travel as `Err` values instead of crossing a task
/// boundary as panics.
pub type GenerationResult<T> = Result<T, switchboard_error::SwitchboardError>;
