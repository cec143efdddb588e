//! Test utilities for orchestration tests.

pub mod scripted_client;

#[allow(unused_imports)]
pub use scripted_client::ScriptedClient;

use std::sync::Arc;
use switchboard_channels::ResultReceiver;
use switchboard_core::GenerationResult;
use switchboard_models::LocalBackendService;
use switchboard_prompt::FileTemplates;
use switchboard_server::{ModelConfigLoader, OpenAIService};

/// A service over `client` with in-memory templates and the given registry.
#[allow(dead_code)]
pub fn service(
    client: Arc<ScriptedClient>,
    loader: ModelConfigLoader,
    templates: FileTemplates,
) -> OpenAIService {
    OpenAIService::new(
        Arc::new(LocalBackendService::new(client)),
        Arc::new(templates),
        Arc::new(loader),
    )
}

/// Receives every item until the channel closes.
#[allow(dead_code)]
pub async fn drain<T>(mut rx: ResultReceiver<T>) -> Vec<GenerationResult<T>> {
    let mut items = Vec::new();
    while let Some(item) = rx.recv().await {
        items.push(item);
    }
    items
}
