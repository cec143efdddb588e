//! Model configuration resolution.

use switchboard_core::{BackendConfig, GenerationRequest};
use switchboard_error::ConfigError;

/// Resolves the backend configuration for a request.
///
/// Implementations own their registry; there is no process-wide instance.
pub trait ConfigResolver: Send + Sync {
    /// The model's settings with the request's overrides applied.
    fn resolve(&self, request: &GenerationRequest) -> Result<BackendConfig, ConfigError>;
}
