//! Backend service and model server clients for the Switchboard gateway.
//!
//! [`LocalBackendService`] implements the backend service the orchestrator
//! generates with. It drives any [`InferenceClient`](switchboard_interface::InferenceClient);
//! [`OpenAICompatibleClient`] talks to llama.cpp-style servers exposing
//! `/v1/completions`.

mod finetune;
mod openai_compat;
mod service;

pub use finetune::finetune;
pub use openai_compat::{CompletionRequest, CompletionResponse, OpenAICompatibleClient};
pub use service::LocalBackendService;
