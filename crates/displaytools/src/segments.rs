//! Statement segmentation
//!
//! Splits a logical line into indentation, assignment target, right-hand side
//! and trailing comment. The statement is dedented and parsed with the ruff
//! parser to tell targets apart from values; every offset reported by the
//! parser is mapped back onto the original text of the logical line.

use ruff_python_ast::{Expr, ExprAttribute, Mod, Stmt};
use ruff_python_parser::{Mode, ParseOptions, parse};
use ruff_python_trivia::{PythonWhitespace, leading_indentation};
use ruff_text_size::Ranged;

use crate::{
    error::RewriteError,
    logical_lines::LogicalLine,
    tokenizer::{Token, TokenKind},
};

/// Leading comment-only and blank physical lines bundled with a statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxiliaryPrefix {
    /// Exact text of the removed lines
    pub text: String,
    pub comment_lines: usize,
    pub blank_lines: usize,
}

impl AuxiliaryPrefix {
    pub const fn is_empty(&self) -> bool {
        self.comment_lines == 0 && self.blank_lines == 0
    }
}

/// Assignment target of a statement
///
/// A target with an unsupported shape is not an error by itself: it only
/// matters once the line turns out to carry a special comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LhsResult {
    pub target_text: Option<String>,
    pub extraction_error: Option<RewriteError>,
}

impl LhsResult {
    fn target(text: String) -> Self {
        Self {
            target_text: Some(text),
            extraction_error: None,
        }
    }

    fn failed(error: RewriteError) -> Self {
        Self {
            target_text: None,
            extraction_error: Some(error),
        }
    }
}

/// The parts of one logical line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    pub indent: String,
    pub lhs: LhsResult,
    /// Value expression (assignment) or the whole statement, without comments
    pub rhs: Option<String>,
    /// All comments of the statement, joined
    pub comment: String,
    pub auxiliary: AuxiliaryPrefix,
    /// Deferred indentation problem of the auxiliary lines
    pub indentation_error: Option<RewriteError>,
}

impl Segments {
    /// Segments of a line without any statement
    fn without_statement(line: &LogicalLine) -> Self {
        Self {
            comment: join_comments(&line.tokens),
            ..Self::default()
        }
    }

    pub const fn has_statement(&self) -> bool {
        self.rhs.is_some()
    }

    pub const fn is_assignment(&self) -> bool {
        self.lhs.target_text.is_some()
    }
}

/// Split `line` into its segments.
pub fn line_segments(line: &LogicalLine) -> Segments {
    let (skipped, auxiliary) = strip_auxiliary_lines(line);
    let body = &line.tokens[skipped..];

    let Some(first_real) = body.iter().find(|token| !token.kind.is_auxiliary()) else {
        log::trace!("No statement in {line}");
        return Segments::without_statement(line);
    };

    let aux_end = auxiliary.text.len();
    let indent = leading_indentation(&line.text[aux_end..]).to_owned();
    let indentation_error = check_auxiliary_indentation(line, aux_end);
    let rhs_end = rhs_end(line, body);

    let dedented = Dedented::new(&line.text[aux_end..], &indent, aux_end);
    let statement = parse(&dedented.text, ParseOptions::from(Mode::Ipython))
        .ok()
        .and_then(|parsed| match parsed.into_syntax() {
            Mod::Module(module) => module.body.into_iter().next(),
            Mod::Expression(_) => None,
        });
    if statement.is_none() {
        log::trace!("{line} does not parse as a statement on its own");
    }

    let (lhs, rhs_start) = match statement.as_ref().and_then(assignment_parts) {
        Some((target, value)) => {
            let lhs = match target_text(target, &dedented.text) {
                Ok(text) => LhsResult::target(text),
                Err(error) => LhsResult::failed(error),
            };
            (lhs, dedented.original_offset(value.start().to_usize()))
        }
        None => (LhsResult::default(), line.local_offset(first_real)),
    };

    let rhs = extract_rhs(line, body, rhs_start, rhs_end);
    let comment = join_comments(body);
    log::debug!(
        "Segments of {line}: indent={indent:?} target={:?} rhs={rhs:?} comment={comment:?}",
        lhs.target_text
    );

    Segments {
        indent,
        lhs,
        rhs,
        comment,
        auxiliary,
        indentation_error,
    }
}

/// Count and cut the leading comment-only and blank physical lines.
///
/// Returns the number of consumed tokens together with the removed prefix.
fn strip_auxiliary_lines(line: &LogicalLine) -> (usize, AuxiliaryPrefix) {
    let tokens = &line.tokens;
    let mut index = 0;
    let mut end = 0;
    let mut prefix = AuxiliaryPrefix::default();

    loop {
        match (
            tokens.get(index).map(|token| token.kind),
            tokens.get(index + 1).map(|token| token.kind),
        ) {
            (Some(TokenKind::Comment), Some(TokenKind::Nl)) => {
                prefix.comment_lines += 1;
                end = line.local_end(&tokens[index + 1]);
                index += 2;
            }
            (Some(TokenKind::Nl), _) => {
                prefix.blank_lines += 1;
                end = line.local_end(&tokens[index]);
                index += 1;
            }
            (Some(TokenKind::Dedent), _) => index += 1,
            _ => break,
        }
    }

    prefix.text = line.text[..end].to_owned();
    (index, prefix)
}

/// Whether `line` holds nothing but Python whitespace and its line break
fn is_blank(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n'])
        .trim_whitespace()
        .is_empty()
}

/// Longest indentation shared by all non-blank lines of `text`
fn common_margin(text: &str) -> &str {
    let mut margin: Option<&str> = None;
    for line in text.split_inclusive('\n').filter(|line| !is_blank(line)) {
        let indent = leading_indentation(line);
        margin = Some(match margin {
            None => indent,
            Some(current) => {
                let shared = current
                    .char_indices()
                    .zip(indent.chars())
                    .find(|((_, a), b)| a != b)
                    .map_or_else(|| current.len().min(indent.len()), |((idx, _), _)| idx);
                &current[..shared]
            }
        });
    }
    margin.unwrap_or("")
}

/// Verify that the stripped comment lines belong to the statement's block.
///
/// A comment line closing an indented block lexically belongs to the next
/// statement. That is only tolerated when it is the very first physical line of
/// the logical line and every other comment line sits at the common margin.
fn check_auxiliary_indentation(line: &LogicalLine, aux_end: usize) -> Option<RewriteError> {
    let text = line.text.as_str();
    let margin = common_margin(text);
    let comment_lines: Vec<&str> = text[..aux_end]
        .split_inclusive('\n')
        .filter(|physical| !is_blank(physical))
        .collect();

    let at_margin = |physical: &&str| {
        physical
            .strip_prefix(margin)
            .is_some_and(|rest| rest.starts_with('#'))
    };
    if comment_lines.iter().all(at_margin) {
        return None;
    }

    let rest = text.trim_start();
    let leading = &text[..text.len() - rest.len()];
    let comment_first = !leading.is_empty() && rest.starts_with('#');

    let ambiguity = |message: &str| {
        Some(RewriteError::IndentationAmbiguity {
            line: line.start_line,
            message: message.to_owned(),
        })
    };

    if !comment_first {
        return ambiguity("unexpected indentation trouble");
    }
    if margin.is_empty()
        && leading.chars().all(|c| c == ' ')
        && comment_lines.iter().skip(1).all(at_margin)
    {
        log::trace!("Accepting indented comment at the start of {line}");
        return None;
    }
    ambiguity("Currently not supported: comment line as last line of indented block")
}

/// Line-local offset where the value ends: the start of the trailing comment or
/// the end of the last real token.
fn rhs_end(line: &LogicalLine, body: &[Token]) -> usize {
    body.iter()
        .rev()
        .find(|token| !token.kind.is_ignorable())
        .map_or(0, |token| {
            if token.kind == TokenKind::Comment {
                line.local_offset(token)
            } else {
                line.local_end(token)
            }
        })
}

/// Statement text with its indentation removed from every physical line
struct Dedented {
    text: String,
    /// `(dedented offset, line-local offset)` of every line start
    line_map: Vec<(usize, usize)>,
}

impl Dedented {
    fn new(text: &str, indent: &str, base: usize) -> Self {
        let mut dedented = String::with_capacity(text.len());
        let mut line_map = Vec::new();
        let mut original = base;

        for physical in text.split_inclusive('\n') {
            let kept = physical.strip_prefix(indent).unwrap_or(physical);
            line_map.push((dedented.len(), original + physical.len() - kept.len()));
            dedented.push_str(kept);
            original += physical.len();
        }
        if line_map.is_empty() {
            line_map.push((0, base));
        }

        Self {
            text: dedented,
            line_map,
        }
    }

    fn original_offset(&self, offset: usize) -> usize {
        let line = self.line_map.partition_point(|(start, _)| *start <= offset);
        let (dedented_start, original_start) = self.line_map[line.saturating_sub(1)];
        original_start + (offset - dedented_start)
    }
}

/// Target and value of an assignment statement.
///
/// For chained assignments the target closest to the value is used.
fn assignment_parts(statement: &Stmt) -> Option<(&Expr, &Expr)> {
    match statement {
        Stmt::Assign(assign) => assign
            .targets
            .last()
            .map(|target| (target, assign.value.as_ref())),
        Stmt::AugAssign(assign) => Some((assign.target.as_ref(), assign.value.as_ref())),
        Stmt::AnnAssign(assign) => assign
            .value
            .as_deref()
            .map(|value| (assign.target.as_ref(), value)),
        _ => None,
    }
}

fn shape_name(expr: &Expr) -> &'static str {
    match expr {
        Expr::Name(_) => "name",
        Expr::Attribute(_) => "attribute",
        Expr::Tuple(_) => "tuple",
        Expr::List(_) => "list",
        Expr::Starred(_) => "starred",
        Expr::Subscript(_) => "subscript",
        Expr::Call(_) => "call",
        _ => "expression",
    }
}

/// Render an assignment target as label text.
fn target_text(target: &Expr, source: &str) -> Result<String, RewriteError> {
    let unsupported = |shape: &Expr| RewriteError::UnsupportedTargetShape {
        target: source[target.range()].to_owned(),
        shape: shape_name(shape),
    };

    match target {
        Expr::Name(name) => Ok(name.id.as_str().to_owned()),
        Expr::Attribute(attribute) => resolve_attribute(attribute).map_err(unsupported),
        Expr::Tuple(tuple) => {
            let parts = tuple
                .elts
                .iter()
                .map(|element| match element {
                    Expr::Name(name) => Ok(name.id.as_str().to_owned()),
                    Expr::Attribute(attribute) => resolve_attribute(attribute),
                    other => Err(other),
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(unsupported)?;
            Ok(parts.join(", "))
        }
        other => Err(unsupported(other)),
    }
}

/// Render `C.x.y.z`; the chain has to be rooted at a plain name.
fn resolve_attribute(attribute: &ExprAttribute) -> Result<String, &Expr> {
    let mut parts = vec![attribute.attr.as_str()];
    let mut current = attribute.value.as_ref();
    loop {
        match current {
            Expr::Attribute(inner) => {
                parts.push(inner.attr.as_str());
                current = inner.value.as_ref();
            }
            Expr::Name(name) => {
                parts.push(name.id.as_str());
                break;
            }
            other => return Err(other),
        }
    }
    parts.reverse();
    Ok(parts.join("."))
}

/// Cut `start..end` out of the line and drop embedded comments together with
/// the whitespace in front of them.
fn extract_rhs(line: &LogicalLine, body: &[Token], start: usize, end: usize) -> Option<String> {
    if start >= end {
        return None;
    }

    let mut rhs = String::with_capacity(end - start);
    let mut cursor = start;
    for comment in body.iter().filter(|token| token.kind == TokenKind::Comment) {
        let comment_start = line.local_offset(comment);
        let comment_end = line.local_end(comment);
        if comment_start < cursor || comment_end > end {
            continue;
        }
        rhs.push_str(line.text[cursor..comment_start].trim_whitespace_end());
        cursor = comment_end;
    }
    rhs.push_str(&line.text[cursor..end]);

    let rhs = rhs.trim();
    (!rhs.is_empty()).then(|| rhs.to_owned())
}

fn join_comments(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Comment)
        .map(|token| token.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests;
