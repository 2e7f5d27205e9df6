//! Tokenizer adapter
//!
//! Wraps the ruff Python lexer and converts its token stream into the small set
//! of token kinds the rewriter cares about, together with `(line, col)`
//! positions in the style of Python's `tokenize` module. Cells are lexed as
//! IPython source, so help (`obj?`) and escape commands (`%magic`, `!cmd`) are
//! ordinary tokens.

use std::fmt;

use ruff_python_ast::token::TokenKind as LexerKind;
use ruff_python_parser::{Mode, ParseErrorType, ParseOptions, parse_unchecked};
use ruff_text_size::{Ranged, TextRange, TextSize};

use crate::error::RewriteError;

/// Coarse token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifiers and keywords
    Name,
    /// Operators and delimiters
    Op,
    Comment,
    /// String literals, including the parts of f-strings
    String,
    /// End of a logical line (statement terminator)
    Newline,
    /// Newline that does not terminate a statement (blank line, comment line,
    /// newline inside brackets)
    Nl,
    Indent,
    Dedent,
    EndMarker,
    /// Numbers and everything else
    Other,
}

impl TokenKind {
    fn from_lexer(kind: LexerKind) -> Self {
        match kind {
            LexerKind::Name => Self::Name,
            LexerKind::Comment => Self::Comment,
            LexerKind::String
            | LexerKind::FStringStart
            | LexerKind::FStringMiddle
            | LexerKind::FStringEnd => Self::String,
            LexerKind::Newline => Self::Newline,
            LexerKind::NonLogicalNewline => Self::Nl,
            LexerKind::Indent => Self::Indent,
            LexerKind::Dedent => Self::Dedent,
            LexerKind::EndOfFile => Self::EndMarker,
            LexerKind::Question => Self::Op,
            LexerKind::IpyEscapeCommand => Self::Other,
            kind if kind.is_keyword() || kind.is_soft_keyword() => Self::Name,
            kind if kind.is_operator() => Self::Op,
            _ => Self::Other,
        }
    }

    /// Tokens that close or pad a logical line without contributing code.
    pub const fn is_ignorable(self) -> bool {
        matches!(
            self,
            Self::Newline | Self::Nl | Self::Dedent | Self::EndMarker
        )
    }

    /// Tokens that may make up a line that does nothing.
    pub const fn is_auxiliary(self) -> bool {
        self.is_ignorable() || matches!(self, Self::Indent | Self::Comment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "NAME",
            Self::Op => "OP",
            Self::Comment => "COMMENT",
            Self::String => "STRING",
            Self::Newline => "NEWLINE",
            Self::Nl => "NL",
            Self::Indent => "INDENT",
            Self::Dedent => "DEDENT",
            Self::EndMarker => "ENDMARKER",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Location of a token boundary: 1-based line, 0-based byte column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A single lexical token of the source block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte range in the tokenized source
    pub range: TextRange,
    pub start: Position,
    pub end: Position,
}

impl Token {
    fn new(source: &str, index: &LineIndex, kind: TokenKind, range: TextRange) -> Self {
        Self {
            kind,
            text: source[range].to_owned(),
            range,
            start: index.position(range.start().to_usize()),
            end: index.position(range.end().to_usize()),
        }
    }

    pub fn start_offset(&self) -> usize {
        self.range.start().to_usize()
    }

    pub fn end_offset(&self) -> usize {
        self.range.end().to_usize()
    }
}

/// Maps byte offsets to physical lines
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self { line_starts }
    }

    /// 0-based physical line containing `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Byte offset where the 0-based `line` starts
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts[line]
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = self.line_of(offset);
        Position {
            line: line + 1,
            col: offset - self.line_starts[line],
        }
    }
}

/// Tokenize `source`, never failing.
///
/// The lexer recovers from lexical errors (e.g. an unterminated string): the
/// offending span is reported as [`TokenKind::Other`] and lexing continues, so
/// statements after the error are still seen. The stream always ends with an
/// end marker.
pub fn tokenize(source: &str) -> Vec<Token> {
    let (mut tokens, failure) = lex(source);
    if let Some(failure) = failure {
        log::debug!(
            "Lexical error at offset {}: {}; continuing with recovered tokens",
            failure.offset.to_usize(),
            failure.message
        );
    }
    if tokens.last().is_none_or(|token| token.kind != TokenKind::EndMarker) {
        let eof = TextRange::empty(TextSize::of(source));
        tokens.push(Token::new(
            source,
            &LineIndex::new(source),
            TokenKind::EndMarker,
            eof,
        ));
    }
    tokens
}

/// Tokenize `source`, surfacing the first lexical error.
pub fn tokenize_strict(source: &str) -> Result<Vec<Token>, RewriteError> {
    match lex(source) {
        (tokens, None) => Ok(tokens),
        (_, Some(failure)) => Err(RewriteError::Tokenization {
            message: failure.message,
            offset: failure.offset.to_usize(),
        }),
    }
}

/// First lexical error reported by the lexer
struct LexFailure {
    message: String,
    offset: TextSize,
}

fn lex(source: &str) -> (Vec<Token>, Option<LexFailure>) {
    let parsed = parse_unchecked(source, ParseOptions::from(Mode::Ipython));
    let index = LineIndex::new(source);

    let tokens = parsed
        .tokens()
        .iter()
        .map(|token| {
            Token::new(
                source,
                &index,
                TokenKind::from_lexer(token.kind()),
                token.range(),
            )
        })
        .collect();

    let failure = parsed
        .errors()
        .iter()
        .filter(|error| matches!(error.error, ParseErrorType::Lexical(_)))
        .min_by_key(|error| error.range().start())
        .map(|error| LexFailure {
            message: error.error.to_string(),
            offset: error.range().start(),
        });

    (tokens, failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_simple_assignment_with_comment() {
        let tokens = tokenize("x = 1 # c\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Other,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
        let comment = &tokens[3];
        assert_eq!(comment.text, "# c");
        assert_eq!(comment.start, Position { line: 1, col: 6 });
        assert_eq!(comment.end, Position { line: 1, col: 9 });
    }

    #[test]
    fn test_comment_and_blank_lines_are_non_logical() {
        let tokens = tokenize("# c\n\nx\n");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Comment,
                TokenKind::Nl,
                TokenKind::Nl,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn test_keywords_are_names() {
        let tokens = tokenize("if True:\n    pass\n");
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "if");
        assert!(tokens.iter().any(|token| token.kind == TokenKind::Indent));
    }

    #[test]
    fn test_newline_inside_brackets_is_nl() {
        let tokens = tokenize("z = [1,\n     2]\n");
        let newlines: Vec<_> = tokens
            .iter()
            .filter(|token| matches!(token.kind, TokenKind::Newline | TokenKind::Nl))
            .map(|token| token.kind)
            .collect();
        assert_eq!(newlines, vec![TokenKind::Nl, TokenKind::Newline]);
    }

    #[test]
    fn test_unterminated_string_is_tolerated() {
        let source = "x = 1\ny = \"\"\"abc\n";
        let tokens = tokenize(source);
        assert_eq!(
            kinds(&tokens[..4]),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Other,
                TokenKind::Newline
            ]
        );
        let last = tokens.last().expect("synthetic end marker");
        assert_eq!(last.kind, TokenKind::EndMarker);
        assert_eq!(last.end_offset(), source.len());
    }

    #[test]
    fn test_lexing_continues_after_unterminated_string() {
        let tokens = tokenize("x = 'abc\ny = 1\n");
        let newlines = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Newline)
            .count();
        assert_eq!(newlines, 2);
        assert!(
            tokens
                .iter()
                .any(|token| token.kind == TokenKind::Name && token.text == "y")
        );
    }

    #[test]
    fn test_ipython_syntax_is_lexed() {
        let source = "x?\n?np.zeros\n%timeit f()\n";
        assert!(tokenize_strict(source).is_ok());

        let tokens = tokenize(source);
        assert_eq!(
            kinds(&tokens[..3]),
            vec![TokenKind::Name, TokenKind::Op, TokenKind::Newline]
        );
        assert_eq!(
            tokens
                .iter()
                .filter(|token| token.kind == TokenKind::Newline)
                .count(),
            3
        );
    }

    #[test]
    fn test_unterminated_string_fails_strictly() {
        let result = tokenize_strict("y = \"\"\"abc\n");
        assert!(matches!(result, Err(RewriteError::Tokenization { .. })));
    }

    #[test]
    fn test_line_index_positions() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.line_of(0), 0);
        assert_eq!(index.line_of(2), 0);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_start(1), 3);
        assert_eq!(index.position(4), Position { line: 2, col: 1 });
    }
}
