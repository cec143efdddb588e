//! Registry of per-model backend configurations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use switchboard_core::{BackendConfig, GenerationRequest};
use switchboard_error::{ConfigError, ConfigErrorKind};
use switchboard_interface::ConfigResolver;
use tracing::{debug, info, instrument, warn};

/// Explicitly owned registry of model configurations.
///
/// Configs come from `<name>.toml` files or are registered directly.
/// Resolution clones the registered config, or starts from defaults for an
/// unknown model, and layers the request's overrides on top.
///
/// # Examples
///
/// ```
/// use switchboard_core::{BackendConfig, GenerationRequest};
/// use switchboard_interface::ConfigResolver;
/// use switchboard_server::ModelConfigLoader;
///
/// let loader = ModelConfigLoader::new();
/// let mut config = BackendConfig::for_model("hermes");
/// config.system_prompt = "Be brief.".to_string();
/// loader.register(config);
///
/// let request = GenerationRequest::builder()
///     .model("hermes")
///     .prompts(vec!["Hi".to_string()])
///     .build()
///     .unwrap();
/// let resolved = loader.resolve(&request).unwrap();
/// assert_eq!(resolved.system_prompt, "Be brief.");
/// assert_eq!(resolved.prompt_strings, vec!["Hi".to_string()]);
/// ```
#[derive(Debug)]
pub struct ModelConfigLoader {
    configs: RwLock<HashMap<String, BackendConfig>>,
    default_n: u32,
}

impl Default for ModelConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelConfigLoader {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            configs: RwLock::default(),
            default_n: 1,
        }
    }

    /// Completions per prompt for models without a config.
    pub fn with_default_n(mut self, default_n: u32) -> Self {
        self.default_n = default_n.max(1);
        self
    }

    /// Registers `config` under its name, replacing any previous entry.
    pub fn register(&self, mut config: BackendConfig) {
        if config.model.is_empty() {
            config.model = config.name.clone();
        }
        debug!(model = %config.name, "Registering model config");
        self.configs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(config.name.clone(), config);
    }

    /// A registered config by name.
    pub fn get(&self, name: &str) -> Option<BackendConfig> {
        self.configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Names of all registered models, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .configs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Loads and registers one TOML model config.
    ///
    /// A config without a name is registered under the file stem.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn load_file(&self, path: &Path) -> Result<BackendConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(ConfigErrorKind::FileRead {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        let mut config: BackendConfig = toml::from_str(&text).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        if config.name.is_empty() {
            config.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        if config.name.is_empty() {
            return Err(ConfigError::invalid(format!(
                "Model config {} has no name",
                path.display()
            )));
        }

        self.register(config.clone());
        Ok(config)
    }

    /// Loads every `*.toml` file in `dir`, returning how many were loaded.
    ///
    /// Files that fail to parse are skipped with a warning.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn load_from_path(&self, dir: &Path) -> Result<usize, ConfigError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ConfigError::new(ConfigErrorKind::FileRead {
                path: dir.display().to_string(),
                message: e.to_string(),
            })
        })?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match self.load_file(&path) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping model config"),
            }
        }

        info!(loaded, "Model configs loaded");
        Ok(loaded)
    }
}

impl ConfigResolver for ModelConfigLoader {
    #[instrument(skip_all, fields(model = %request.model()))]
    fn resolve(&self, request: &GenerationRequest) -> Result<BackendConfig, ConfigError> {
        if request.model().is_empty() {
            return Err(ConfigError::new(ConfigErrorKind::MissingModel));
        }

        let mut config = self.get(request.model()).unwrap_or_else(|| {
            debug!("No config registered, using defaults");
            let mut config = BackendConfig::for_model(request.model());
            config.parameters.n = self.default_n;
            config
        });

        config.prompt_strings = request.prompts().clone();
        if let Some(n) = request.n() {
            config.parameters.n = (*n).max(1);
        }
        if let Some(max_tokens) = request.max_tokens() {
            config.parameters.max_tokens = Some(*max_tokens);
        }
        if let Some(temperature) = request.temperature() {
            config.parameters.temperature = Some(*temperature);
        }
        if !request.stop().is_empty() {
            config.parameters.stop = request.stop().clone();
        }
        if let Some(grammar) = request.grammar().as_ref().filter(|g| !g.is_empty()) {
            config.grammar = Some(grammar.clone());
        }
        config.function_call = request.tool_choice().clone();

        Ok(config)
    }
}
