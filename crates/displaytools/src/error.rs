//! Error type for cell rewriting
//!
//! Every variant aborts the rewrite of the whole cell. Callers are expected to
//! report the message and execute the original, unmodified cell.

use std::fmt;

/// Failure raised while analysing or rewriting a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// The source could not be lexically analysed.
    Tokenization {
        /// Lexer message
        message: String,
        /// Byte offset where the lexer gave up
        offset: usize,
    },

    /// A comment-only line sits at a dedent boundary and cannot be attributed
    /// to either the block above or the statement below.
    IndentationAmbiguity {
        /// 0-based physical line where the ambiguous logical line starts
        line: usize,
        /// Human readable explanation
        message: String,
    },

    /// The assignment target has a shape that cannot be rendered as a label.
    UnsupportedTargetShape {
        /// Source text of the whole target
        target: String,
        /// Kind of the offending (sub-)expression, e.g. `tuple` or `subscript`
        shape: &'static str,
    },

    /// Raised on purpose when a cell contains the test sentinel.
    ForcedFailure,
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenization { message, offset } => {
                write!(f, "tokenization failed at offset {offset}: {message}")
            }
            Self::IndentationAmbiguity { line, message } => {
                write!(f, "{message} (logical line starting at line {})", line + 1)
            }
            Self::UnsupportedTargetShape { target, shape } => write!(
                f,
                "Unexpected AST-type `{shape}` when evaluating assignment target `{target}`"
            ),
            Self::ForcedFailure => write!(f, "Virtual syntax error (only for testing)"),
        }
    }
}

impl std::error::Error for RewriteError {}
