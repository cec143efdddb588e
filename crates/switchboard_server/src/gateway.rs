//! Gateway-wide settings.

use derive_getters::Getters;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use switchboard_error::{ConfigError, ConfigErrorKind};
use tracing::{debug, instrument};

/// Environment variable prefix for gateway settings.
pub const ENV_PREFIX: &str = "SWITCHBOARD";

/// Settings shared by every orchestration call.
///
/// Loaded from an optional TOML file, then overridden by `SWITCHBOARD_*`
/// environment variables (`SWITCHBOARD_MODELS_PATH`, `SWITCHBOARD_DEFAULT_N`,
/// `SWITCHBOARD_BACKEND_URL`, `SWITCHBOARD_DEBUG`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Getters)]
#[serde(default)]
pub struct GatewayConfig {
    /// Directory holding model configs and templates
    models_path: PathBuf,
    /// Completions per prompt when neither the request nor the model sets it
    default_n: u32,
    /// Base URL of the model server
    backend_url: String,
    /// Verbose logging
    debug: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            models_path: PathBuf::from("models"),
            default_n: 1,
            backend_url: "http://localhost:8080".to_string(),
            debug: false,
        }
    }
}

impl GatewayConfig {
    /// Loads settings from `path` (when given) layered under the environment.
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|e| {
                ConfigError::new(ConfigErrorKind::Parse {
                    path: path
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<environment>".to_string()),
                    message: e.to_string(),
                })
            })?;

        debug!(
            models_path = %settings.models_path.display(),
            default_n = settings.default_n,
            "Gateway settings loaded"
        );
        Ok(settings)
    }
}
