//! Grammar compilation.

use switchboard_error::GrammarError;

/// Compiles a JSON schema into a grammar the backend can constrain output
/// with.
pub trait GrammarCompiler: Send + Sync {
    /// Compiles `schema` into grammar source text.
    fn compile(&self, schema: &serde_json::Value) -> Result<String, GrammarError>;
}
