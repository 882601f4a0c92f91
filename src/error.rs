//! Error types for expression compilation and evaluation.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, ExprError>;

/// Error type for expression compilation and evaluation.
///
/// Compilation errors leave the parser in a clean state: the partial tree
/// and program are discarded, and nothing is added to the expression list.
/// Math errors raised while folding constants abort the compilation; math
/// errors raised at evaluation time propagate to the caller unchanged.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Malformed expression text: adjacent operands, misplaced brackets,
    /// unterminated strings, missing operands and the like.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// An operator token that is not present in the word dictionary.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Bracket nesting does not balance. The position is the index of the
    /// offending token.
    #[error("unbalanced brackets at token {0}")]
    UnmatchedBracket(usize),

    /// A function was called with the wrong number of arguments.
    #[error("invalid call to '{name}': expected {expected} arguments, found {found}")]
    InvalidFunctionCall {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A registered word was redefined with a different argument count.
    /// Redefinition rewrites compiled programs in place, which is only
    /// sound when the arity is unchanged.
    #[error("cannot replace '{name}': argument counts differ ({old} vs {new})")]
    ArityMismatch { name: String, old: usize, new: usize },

    /// A numeric kernel produced a non-finite result: division by zero,
    /// domain error or overflow.
    #[error("math error in '{op}'")]
    Math { op: String },

    /// `as_boolean` was called on an expression whose result is numeric.
    #[error("expression result is not boolean")]
    NotBoolean,

    /// An expression index outside the compiled list.
    #[error("no expression with index {0}")]
    BadIndex(usize),

    /// `evaluate_current` was called before any expression was compiled.
    #[error("no expression has been compiled")]
    NoExpression,
}
