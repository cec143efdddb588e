//! Error types for the Switchboard inference gateway.
//!
//! Every error family records the source location where it was created.
//! [`SwitchboardError`] is the crate-wide error; any family converts into it
//! with `?`.

mod backend;
mod config;
mod grammar;
mod template;

pub use backend::{BackendError, BackendErrorKind};
pub use config::{ConfigError, ConfigErrorKind};
pub use grammar::{GrammarError, GrammarErrorKind};
pub use template::{TemplateError, TemplateErrorKind};

/// Crate-level error variants.
#[derive(Debug, Clone, derive_more::From, derive_more::Display)]
pub enum SwitchboardErrorKind {
    /// Model configuration could not be resolved
    #[display("{}", _0)]
    Config(ConfigError),
    /// Prompt template evaluation failed
    #[display("{}", _0)]
    Template(TemplateError),
    /// Function-call grammar could not be compiled
    #[display("{}", _0)]
    Grammar(GrammarError),
    /// Backend invocation failed
    #[display("{}", _0)]
    Backend(BackendError),
}

/// Switchboard error with kind discrimination.
///
/// # Examples
///
/// ```
/// use switchboard_error::{BackendError, BackendErrorKind, SwitchboardError, SwitchboardErrorKind};
///
/// let err: SwitchboardError = BackendError::inference("out of memory").into();
/// assert!(matches!(err.kind(), SwitchboardErrorKind::Backend(_)));
/// ```
#[derive(Debug, Clone)]
pub struct SwitchboardError(Box<SwitchboardErrorKind>);

impl SwitchboardError {
    /// Create a new error from a kind.
    pub fn new(kind: SwitchboardErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SwitchboardErrorKind {
        &self.0
    }

    /// Whether the error was raised before any channel was created.
    pub fn is_synchronous(&self) -> bool {
        matches!(
            *self.0,
            SwitchboardErrorKind::Config(_) | SwitchboardErrorKind::Grammar(_)
        )
    }
}

impl std::fmt::Display for SwitchboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Switchboard Error: {}", self.0)
    }
}

impl std::error::Error for SwitchboardError {}

impl<T> From<T> for SwitchboardError
where
    T: Into<SwitchboardErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Switchboard operations.
pub type SwitchboardResult<T> = std::result::Result<T, SwitchboardError>;
