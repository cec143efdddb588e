//! Switchboard: an OpenAI-compatible inference gateway.
//!
//! One request is turned into one or more backend generations and the
//! results are recombined into OpenAI-shaped responses. This crate
//! re-exports the public surface of the workspace:
//!
//! - [`switchboard_core`] request, response and trace types
//! - [`switchboard_channels`] merge and reduce over result channels
//! - [`switchboard_prompt`] template selection and chat prompt assembly
//! - [`switchboard_functions`] function-call grammars and output parsing
//! - [`switchboard_models`] the backend service and model server client
//! - [`switchboard_server`] the Completion, Edit and Chat orchestrator
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchboard::{
//!     ChatMessage, FileTemplates, GenerationRequest, LocalBackendService, ModelConfigLoader,
//!     OpenAICompatibleClient, OpenAIService, StreamOptions,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAICompatibleClient::new(
//!     "http://localhost:8080".to_string(),
//!     "llama".to_string(),
//!     "local",
//! );
//! let service = OpenAIService::new(
//!     Arc::new(LocalBackendService::new(client)),
//!     Arc::new(FileTemplates::new("models")),
//!     Arc::new(ModelConfigLoader::new()),
//! );
//!
//! let request = GenerationRequest::builder()
//!     .model("llama")
//!     .messages(vec![ChatMessage::user("Hi")])
//!     .build()?;
//!
//! let mut call = service.chat(request, StreamOptions::none()).await?;
//! while let Some(chunk) = call.results.recv().await {
//!     println!("{}", serde_json::to_string(&chunk?)?);
//! }
//! # Ok(())
//! # }
//! ```

pub use switchboard_channels::*;
pub use switchboard_core::*;
pub use switchboard_error::*;
pub use switchboard_functions::*;
pub use switchboard_interface::*;
pub use switchboard_models::*;
pub use switchboard_prompt::*;
pub use switchboard_server::*;
