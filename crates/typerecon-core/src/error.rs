//! Error types for type reconstruction
//!
//! Unresolvable program values are never errors: they end up typed as
//! `Type::Unknown`. The variants here signal upstream contract violations
//! (malformed declarations, IR the engine does not understand) and abort a run.

use crate::ir::OpId;
use thiserror::Error;

/// Failure to parse a type declaration string such as `?Foo` or `int|string[]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("empty type declaration")]
    Empty,

    #[error("unknown type declaration found: {0}")]
    InvalidIdentifier(String),

    #[error("unmatched parentheses in type declaration: {0}")]
    UnmatchedParentheses(String),

    /// A `|` or `&` with nothing on its left, or a parenthesized group
    /// followed by something other than a combinator.
    #[error("unknown position of combinator: {0}")]
    DanglingCombinator(String),

    #[error("no combinator found: {0}")]
    MissingCombinator(String),
}

/// Fatal failure of a reconstruction run.
#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error("unknown value type found: {kind}")]
    UnsupportedLiteral { kind: &'static str },

    #[error("operation {op:?} of kind `{kind}` is not modeled by the reconstructor")]
    UnmodeledOperation { op: OpId, kind: &'static str },

    #[error("removing `{removed}` from `{from}` leaves no member types")]
    EmptyCombinator { from: String, removed: String },

    #[error("expected a string literal for {role}, found a {kind} literal")]
    NonStringLiteral {
        role: &'static str,
        kind: &'static str,
    },

    #[error("invalid built-in signature table: {0}")]
    Builtins(#[from] serde_json::Error),
}

pub type Result<T, E = ReconstructError> = std::result::Result<T, E>;
