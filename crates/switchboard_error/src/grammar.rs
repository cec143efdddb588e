//! Grammar compilation error types.

/// Grammar compilation failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GrammarErrorKind {
    /// No functions remained to build a grammar from
    #[display("Function set is empty")]
    EmptyFunctionSet,
    /// A pinned function is not part of the function set
    #[display("Unknown function: {}", _0)]
    UnknownFunction(String),
    /// A parameter schema cannot be expressed as a grammar
    #[display("Unsupported schema at {}: {}", path, message)]
    UnsupportedSchema {
        /// Location of the offending node inside the schema
        path: String,
        /// Description of the problem
        message: String,
    },
}

/// Grammar error with source location.
///
/// # Examples
///
/// ```
/// use switchboard_error::{GrammarError, GrammarErrorKind};
///
/// let err = GrammarError::new(GrammarErrorKind::UnknownFunction("get_weather".into()));
/// assert!(format!("{}", err).contains("get_weather"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Grammar Error: {} at line {} in {}", kind, line, file)]
pub struct GrammarError {
    /// The kind of error that occurred
    pub kind: GrammarErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl GrammarError {
    /// Create a new GrammarError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GrammarErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
