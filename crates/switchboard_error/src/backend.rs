//! Backend error types.

/// Backend invocation failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BackendErrorKind {
    /// No backend instance could be obtained for the model
    #[display("Backend unavailable: {}", _0)]
    Unavailable(String),
    /// The backend failed while generating
    #[display("Inference failed: {}", _0)]
    Inference(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// The backend reply could not be decoded
    #[display("Response parsing failed: {}", _0)]
    ResponseParsing(String),
    /// A result stream ended before delivering a value
    #[display("Stream interrupted: {}", _0)]
    Stream(String),
}

impl BackendErrorKind {
    /// Check if this error type is worth retrying against the same backend.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            BackendErrorKind::Unavailable(_) => true,
            _ => false,
        }
    }
}

/// Backend error with source location.
///
/// # Examples
///
/// ```
/// use switchboard_error::{BackendError, BackendErrorKind};
///
/// let err = BackendError::new(BackendErrorKind::Unavailable("llama".to_string()));
/// assert!(format!("{}", err).contains("unavailable"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Backend Error: {} at line {} in {}", kind, line, file)]
pub struct BackendError {
    /// The kind of error that occurred
    pub kind: BackendErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl BackendError {
    /// Create a new BackendError with the given kind at the current location.
    #[track_caller]
    pub fn new(kind: BackendErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an [`BackendErrorKind::Inference`] error.
    #[track_caller]
    pub fn inference(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Inference(message.into()))
    }
}
