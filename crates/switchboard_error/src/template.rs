//! Prompt template error types.

/// Template evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum TemplateErrorKind {
    /// No template with this name is known
    #[display("Template not found: {}", _0)]
    NotFound(String),
    /// The template file could not be read
    #[display("Failed to read template {}: {}", name, message)]
    Read {
        /// Template name
        name: String,
        /// Underlying I/O message
        message: String,
    },
    /// Rendering failed
    #[display("Failed to render template {}: {}", name, message)]
    Render {
        /// Template name
        name: String,
        /// Description of the failure
        message: String,
    },
}

/// Template error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Template Error: {} at line {} in {}", kind, line, file)]
pub struct TemplateError {
    /// The kind of error that occurred
    pub kind: TemplateErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl TemplateError {
    /// Create a new TemplateError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: TemplateErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
