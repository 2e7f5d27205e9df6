//! Logical line segmentation
//!
//! A logical line is one statement together with everything the lexer attaches
//! to it: leading comment-only and blank physical lines, continuation lines
//! inside brackets, and the trailing comment.

use std::fmt;

use crate::tokenizer::{LineIndex, Token, TokenKind, tokenize};

/// One statement of a cell with its exact source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Exact slice of the cell, including the terminating line break
    pub text: String,
    /// Tokens of this line; ranges refer to the whole cell
    pub tokens: Vec<Token>,
    /// 0-based first physical line
    pub start_line: usize,
    /// 0-based last physical line
    pub end_line: usize,
    /// Byte offset of `text` in the cell
    pub offset: usize,
}

impl LogicalLine {
    /// Offset of `token` relative to the start of this line
    pub fn local_offset(&self, token: &Token) -> usize {
        token.start_offset() - self.offset
    }

    pub fn local_end(&self, token: &Token) -> usize {
        token.end_offset() - self.offset
    }

    /// Whether the line carries no code at all
    pub fn is_auxiliary(&self) -> bool {
        self.tokens.iter().all(|token| token.kind.is_auxiliary())
    }
}

impl fmt::Display for LogicalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.text.strip_suffix('\n').unwrap_or(&self.text);
        write!(f, "<LL: {text}>")
    }
}

/// Split `source` into logical lines using the lenient tokenizer.
pub fn segment(source: &str) -> Vec<LogicalLine> {
    segment_tokens(source, tokenize(source))
}

/// Split `source` into logical lines from an existing token stream.
///
/// A new line starts after every statement terminator. The remainder after the
/// last terminator (possibly empty) always forms a final logical line.
pub fn segment_tokens(source: &str, tokens: Vec<Token>) -> Vec<LogicalLine> {
    let index = LineIndex::new(source);
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut start = 0;

    for token in tokens {
        let terminator = (token.kind == TokenKind::Newline).then(|| token.end_offset());
        current.push(token);
        if let Some(end) = terminator {
            lines.push(build_line(
                source,
                &index,
                start,
                end,
                std::mem::take(&mut current),
            ));
            start = end;
        }
    }

    lines.push(build_line(source, &index, start, source.len(), current));
    log::trace!("Segmented cell into {} logical lines", lines.len());
    lines
}

fn build_line(
    source: &str,
    index: &LineIndex,
    start: usize,
    end: usize,
    tokens: Vec<Token>,
) -> LogicalLine {
    let end_line = if end > start {
        index.line_of(end - 1)
    } else {
        index.line_of(start)
    };
    LogicalLine {
        text: source[start..end].to_owned(),
        tokens,
        start_line: index.line_of(start),
        end_line,
        offset: start,
    }
}
