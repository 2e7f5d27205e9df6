//! Line rewriting
//!
//! Walks the logical lines of a cell from last to first and inserts (or
//! substitutes) a display call for every statement that carries a special
//! comment. Lines without a marker are copied verbatim.

use cow_utils::CowUtils;

use crate::{
    error::RewriteError,
    logical_lines::{LogicalLine, segment},
    markers::{CommentFlags, classify_comment},
    segments::{Segments, line_segments},
    tokenizer::{TokenKind, tokenize_strict},
};

/// Cells containing this text fail on purpose.
pub const FORCED_FAILURE_SENTINEL: &str = "##!! raise TestException !!";

/// Python names emitted in generated lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNames {
    pub display: String,
    pub custom_display: String,
    pub info: String,
    /// Text published between consecutive displays
    pub delimiter: String,
}

impl Default for CallNames {
    fn default() -> Self {
        Self {
            display: "display".to_owned(),
            custom_display: "custom_display".to_owned(),
            info: "_ipydex__info".to_owned(),
            delimiter: "---".to_owned(),
        }
    }
}

impl CallNames {
    /// Statement that publishes the delimiter
    pub fn delimiter_call(&self) -> String {
        format!(
            "{}({{\"text/plain\": {}}}, raw=True)",
            self.display,
            python_string(&self.delimiter)
        )
    }

    /// Names the executing namespace has to provide
    pub fn helper_names(&self) -> [&str; 3] {
        [
            self.display.as_str(),
            self.custom_display.as_str(),
            self.info.as_str(),
        ]
    }
}

/// Analysis result for one logical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReport {
    pub line: LogicalLine,
    pub segments: Segments,
    pub flags: CommentFlags,
}

impl LineReport {
    fn new(line: LogicalLine) -> Self {
        let segments = line_segments(&line);
        let mut flags = classify_comment(&segments.comment);
        if segments.has_statement() {
            flags.is_assignment = Some(segments.is_assignment());
        } else {
            flags.is_comment_only_line = !segments.comment.is_empty();
        }
        Self {
            line,
            segments,
            flags,
        }
    }

    /// Whether the line gets a display call
    pub const fn is_marked(&self) -> bool {
        self.flags.has_marker && self.segments.has_statement()
    }
}

/// Rewrites cells according to their special comments
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    names: CallNames,
}

impl Rewriter {
    pub const fn new(names: CallNames) -> Self {
        Self { names }
    }

    pub const fn names(&self) -> &CallNames {
        &self.names
    }

    /// Segment and classify every logical line of `cell`.
    pub fn analyze(&self, cell: &str) -> Vec<LineReport> {
        segment(cell).into_iter().map(LineReport::new).collect()
    }

    /// Rewrite `cell`, inserting display calls after marked lines.
    ///
    /// The rewrite is all or nothing: the first error aborts the whole cell.
    pub fn rewrite(&self, cell: &str) -> Result<String, RewriteError> {
        if cell.contains(FORCED_FAILURE_SENTINEL) {
            return Err(RewriteError::ForcedFailure);
        }

        let reports = self.analyze(cell);
        let mut pieces = Vec::with_capacity(reports.len());
        for report in reports.iter().rev() {
            pieces.push(self.rewrite_line(report)?);
        }
        pieces.reverse();

        let rewritten = pieces.concat();
        let body = rewritten.trim_end_matches(['\r', '\n']);
        Ok(format!("{body}{}", trailing_newlines(cell)))
    }

    fn rewrite_line(&self, report: &LineReport) -> Result<String, RewriteError> {
        let LineReport {
            line,
            segments,
            flags,
        } = report;

        let Some(rhs) = segments.rhs.as_deref().filter(|_| flags.has_marker) else {
            return Ok(line.text.clone());
        };

        if let Some(error) = &segments.indentation_error {
            return Err(error.clone());
        }
        if let Some(error) = &segments.lhs.extraction_error {
            return Err(error.clone());
        }

        let ending = line_ending(&line.text);
        let mut piece = String::with_capacity(line.text.len() * 2);
        let expression = match segments.lhs.target_text.as_deref() {
            Some(target) => {
                piece.push_str(&line.text);
                if !line.text.ends_with('\n') {
                    piece.push_str(ending);
                }
                target
            }
            None => {
                piece.push_str(&segments.auxiliary.text);
                rhs
            }
        };

        let call = self.display_call(flags, expression);
        log::debug!("{line} -> {call}");
        piece.push_str(&segments.indent);
        piece.push_str(&call);
        piece.push_str(ending);
        Ok(piece)
    }

    /// Generated statement for `expression` according to `flags`.
    pub fn display_call(&self, flags: &CommentFlags, expression: &str) -> String {
        let argument = display_argument(expression, flags.wants_transpose);
        let delimiter = self.names.delimiter_call();

        if !flags.wants_label {
            return format!("{}({argument}); {delimiter}", self.names.display);
        }

        let (label, value) = if flags.wants_shape {
            (format!("{argument}.shape"), format!("{argument}.shape"))
        } else if flags.wants_info {
            (
                format!("info({argument})"),
                format!("{}({argument})", self.names.info),
            )
        } else {
            (argument.clone(), argument)
        };

        format!(
            "{}({}, {value}); {delimiter}",
            self.names.custom_display,
            python_string(&label)
        )
    }
}

/// Rewrite `cell` with the default call names.
pub fn rewrite(cell: &str) -> Result<String, RewriteError> {
    Rewriter::default().rewrite(cell)
}

/// Whether `expression` is exactly one identifier.
pub fn is_single_name(expression: &str) -> bool {
    let Ok(tokens) = tokenize_strict(expression.trim()) else {
        return false;
    };
    let mut names = 0;
    for token in &tokens {
        match token.kind {
            TokenKind::Name => names += 1,
            TokenKind::Newline | TokenKind::Nl | TokenKind::EndMarker => {}
            _ => return false,
        }
    }
    names == 1
}

/// Expression as it appears inside the generated call.
///
/// Anything but a bare name is parenthesized so that a trailing `.T` or
/// `.shape` applies to the whole expression.
pub fn display_argument(expression: &str, transpose: bool) -> String {
    let expression = expression.trim();
    // Bare names stay unparenthesized for expression lines too, so `y ##:`
    // yields `custom_display("y", y)` rather than `("(y)", (y))`.
    let mut argument = if is_single_name(expression) {
        expression.to_owned()
    } else {
        format!("({expression})")
    };
    if transpose {
        argument.push_str(".T");
    }
    argument
}

/// Double-quoted Python string literal for `text`
fn python_string(text: &str) -> String {
    let escaped = text
        .cow_replace('\\', "\\\\")
        .cow_replace('"', "\\\"")
        .cow_replace('\r', "\\r")
        .cow_replace('\n', "\\n")
        .into_owned();
    format!("\"{escaped}\"")
}

fn line_ending(text: &str) -> &'static str {
    if text.ends_with("\r\n") { "\r\n" } else { "\n" }
}

/// The run of line breaks that ends `text`
fn trailing_newlines(text: &str) -> &str {
    &text[text.trim_end_matches(['\r', '\n']).len()..]
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::markers::MarkerKind;

    fn flags_for(comment: &str) -> CommentFlags {
        classify_comment(comment)
    }

    #[test]
    fn test_is_single_name() {
        assert!(is_single_name("a"));
        assert!(is_single_name("abc_xyz "));

        assert!(!is_single_name("abc,xyz "));
        assert!(!is_single_name("abc, xyz, qwe"));
        assert!(!is_single_name("abc + xyz"));
        assert!(!is_single_name("abc - xyz"));
        assert!(!is_single_name("abc*xyz-1"));
        assert!(!is_single_name("abc/xyz-1"));
        assert!(!is_single_name("abc%xyz-1"));
        assert!(!is_single_name("abc^xyz-1"));
        assert!(!is_single_name("C.xyz"));
        assert!(!is_single_name(""));
        assert!(!is_single_name("\"unterminated"));
    }

    #[test]
    fn test_display_argument() {
        assert_eq!(display_argument("y", false), "y");
        assert_eq!(display_argument("yy", true), "yy.T");
        assert_eq!(display_argument("x + y", false), "(x + y)");
        assert_eq!(display_argument("y1, y2", true), "(y1, y2).T");
    }

    #[test]
    fn test_label_call() {
        let rewriter = Rewriter::default();
        assert_snapshot!(
            rewriter.display_call(&flags_for("##:"), "y"),
            @r#"custom_display("y", y); display({"text/plain": "---"}, raw=True)"#
        );
    }

    #[test]
    fn test_shape_call() {
        let rewriter = Rewriter::default();
        assert_snapshot!(
            rewriter.display_call(&flags_for("##:S"), "y"),
            @r#"custom_display("y.shape", y.shape); display({"text/plain": "---"}, raw=True)"#
        );
    }

    #[test]
    fn test_info_call() {
        let rewriter = Rewriter::default();
        assert_snapshot!(
            rewriter.display_call(&flags_for("##:i"), "y"),
            @r#"custom_display("info(y)", _ipydex__info(y)); display({"text/plain": "---"}, raw=True)"#
        );
    }

    #[test]
    fn test_plain_call() {
        let rewriter = Rewriter::default();
        assert_snapshot!(
            rewriter.display_call(&flags_for("##"), "x + y"),
            @r#"display((x + y)); display({"text/plain": "---"}, raw=True)"#
        );
    }

    #[test]
    fn test_transposed_label_call() {
        let rewriter = Rewriter::default();
        assert_snapshot!(
            rewriter.display_call(&flags_for("##:T"), "y1, y2"),
            @r#"custom_display("(y1, y2).T", (y1, y2).T); display({"text/plain": "---"}, raw=True)"#
        );
    }

    #[test]
    fn test_custom_call_names() {
        let rewriter = Rewriter::new(CallNames {
            display: "show".to_owned(),
            custom_display: "show_labeled".to_owned(),
            info: "summary".to_owned(),
            delimiter: "===".to_owned(),
        });
        assert_snapshot!(
            rewriter.display_call(&flags_for("##:i"), "a"),
            @r#"show_labeled("info(a)", summary(a)); show({"text/plain": "==="}, raw=True)"#
        );
        assert_eq!(
            rewriter.names().helper_names(),
            ["show", "show_labeled", "summary"]
        );
    }

    #[test]
    fn test_label_is_escaped() {
        let rewriter = Rewriter::default();
        let call = rewriter.display_call(&flags_for("##:"), "d[\"k\"]");
        assert!(call.starts_with(r#"custom_display("(d[\"k\"])", (d["k"]));"#));

        assert_eq!(python_string("a\nb"), r#""a\nb""#);
        assert_eq!(python_string(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn test_trailing_newlines() {
        assert_eq!(trailing_newlines("x\n\n"), "\n\n");
        assert_eq!(trailing_newlines("x"), "");
        assert_eq!(trailing_newlines("x\r\n"), "\r\n");
        assert_eq!(line_ending("x\r\n"), "\r\n");
        assert_eq!(line_ending("x"), "\n");
    }

    #[test]
    fn test_analyze_sets_statement_flags() {
        let reports = Rewriter::default().analyze("x = 1 ##:\n# y = 2 ##:\n");
        assert_eq!(reports[0].flags.is_assignment, Some(true));
        assert_eq!(reports[0].flags.marker, Some(MarkerKind::Label));
        assert!(reports[0].is_marked());

        let trailing = reports.last().expect("final logical line");
        assert!(trailing.flags.is_comment_only_line);
        assert_eq!(trailing.flags.is_assignment, None);
        assert!(!trailing.is_marked());
    }

    #[test]
    fn test_forced_failure() {
        let result = rewrite("x = 1\n##!! raise TestException !!\n");
        assert_eq!(result, Err(RewriteError::ForcedFailure));
    }
}
