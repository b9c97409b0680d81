//! Error types for query compilation.

use thiserror::Error;

/// Why a compile call failed.
///
/// Every failure surfaces as one of these kinds so callers can tell bad
/// syntax from an unknown preset from a catalog that simply has not been
/// loaded yet (the latter is retryable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Malformed input: unbalanced parentheses, unterminated quoting,
    /// an operator with a missing operand, and the like.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The whole input was a bare name, but no preset carries it.
    #[error("unknown preset: {0}")]
    PresetNotFound(String),

    /// A preset lookup was attempted before the catalog was loaded.
    #[error("preset catalog not loaded")]
    CatalogNotReady,
}

impl CompileError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        CompileError::Syntax(msg.into())
    }
}
