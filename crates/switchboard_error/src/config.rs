//! Configuration error types.

/// Kinds of configuration resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ConfigErrorKind {
    /// The request did not name a model
    #[display("Request does not specify a model")]
    MissingModel,
    /// A model configuration file could not be read
    #[display("Failed to read config file {}: {}", path, message)]
    FileRead {
        /// Path of the file
        path: String,
        /// Underlying I/O message
        message: String,
    },
    /// A model configuration file could not be parsed
    #[display("Failed to parse config file {}: {}", path, message)]
    Parse {
        /// Path of the file
        path: String,
        /// Underlying parser message
        message: String,
    },
    /// A configuration value is invalid
    #[display("Invalid configuration: {}", _0)]
    Invalid(String),
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use switchboard_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::new(ConfigErrorKind::MissingModel);
/// assert!(format!("{}", err).contains("model"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// The kind of error that occurred
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given kind at the current location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an [`ConfigErrorKind::Invalid`] error.
    #[track_caller]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid(message.into()))
    }
}
