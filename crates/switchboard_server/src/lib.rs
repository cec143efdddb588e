//! Request orchestration for the Switchboard inference gateway.
//!
//! [`OpenAIService`] turns one OpenAI-style request into backend calls and
//! recombines the results:
//!
//! - **Completion / Edit** fan out one backend call per prompt string and
//!   fold the per-prompt bundles into a single response.
//! - **Chat** assembles the history into one prompt, optionally constrains
//!   the output to a function-call grammar, and streams response chunks.
//!
//! Model settings come from a [`ModelConfigLoader`]; gateway-wide settings
//! from [`GatewayConfig`].

mod chat;
mod finish;
mod gateway;
mod generate;
mod loader;
mod service;

#[cfg(feature = "metrics")]
mod metrics;

pub use finish::{finish_chunk, finish_reason_for};
pub use gateway::{ENV_PREFIX, GatewayConfig};
pub use loader::ModelConfigLoader;
pub use service::{OpenAIService, Orchestration, StreamOptions};

#[cfg(feature = "metrics")]
pub use metrics::OrchestrationMetrics;
