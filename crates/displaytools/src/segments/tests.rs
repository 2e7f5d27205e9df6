//! Tests for statement segmentation

use pretty_assertions::assert_eq;

use super::*;
use crate::logical_lines::segment;

type Parts = (String, Option<String>, Option<String>, String);

fn parts(segments: &Segments) -> Parts {
    (
        segments.indent.clone(),
        segments.lhs.target_text.clone(),
        segments.rhs.clone(),
        segments.comment.clone(),
    )
}

fn expected(indent: &str, target: Option<&str>, rhs: Option<&str>, comment: &str) -> Parts {
    (
        indent.to_owned(),
        target.map(str::to_owned),
        rhs.map(str::to_owned),
        comment.to_owned(),
    )
}

fn first_line(cell: &str) -> Segments {
    line_segments(&segment(cell)[0])
}

fn all_lines(cell: &str) -> Vec<Segments> {
    segment(cell).iter().map(line_segments).collect()
}

#[test]
fn test_single_line_segments() {
    let cases = [
        ("x = 0", expected("", Some("x"), Some("0"), "")),
        ("# abx", expected("", None, None, "# abx")),
        ("     ", expected("", None, None, "")),
        ("", expected("", None, None, "")),
        ("x + y  ##", expected("", None, Some("x + y"), "##")),
        (
            "x + y + 'z=#'  ##:",
            expected("", None, Some("x + y + 'z=#'"), "##:"),
        ),
        (
            "A =     '#xyz=7'  # abcd ##: efg    ",
            expected("", Some("A"), Some("'#xyz=7'"), "# abcd ##: efg"),
        ),
        ("    A = X  # Z", expected("    ", Some("A"), Some("X"), "# Z")),
        (
            "    y, x, z = A = X  # Z",
            expected("    ", Some("A"), Some("X"), "# Z"),
        ),
        (
            "    A = y, x, z = X  # Z",
            expected("    ", Some("y, x, z"), Some("X"), "# Z"),
        ),
        (
            "x = func1(a=a, b = b) ##:",
            expected("", Some("x"), Some("func1(a=a, b = b)"), "##:"),
        ),
        ("xyz=x ##:i", expected("", Some("xyz"), Some("x"), "##:i")),
    ];

    for (cell, want) in cases {
        assert_eq!(parts(&first_line(cell)), want, "cell: {cell:?}");
    }
}

#[test]
fn test_expression_lines_inside_blocks() {
    let segments = all_lines("x = 0\nif 1:\n    y ##:\nC.xyz ##:\n");
    assert_eq!(parts(&segments[0]), expected("", Some("x"), Some("0"), ""));
    assert_eq!(parts(&segments[2]), expected("    ", None, Some("y"), "##:"));
    assert_eq!(
        parts(&segments[3]),
        expected("", None, Some("C.xyz"), "##:")
    );
}

#[test]
fn test_leading_comment_lines_are_not_part_of_the_comment() {
    let cell = "\
x = 0
if 1:
    # a = 0
    # b = 1 ##:
    WW = 10
    XX = 0 # abc1
    if 1:
        YY = 1
Z1 = 1
Z2 = 2# abc
";
    let segments = all_lines(cell);
    assert_eq!(parts(&segments[0]), expected("", Some("x"), Some("0"), ""));
    assert_eq!(
        parts(&segments[2]),
        expected("    ", Some("WW"), Some("10"), "")
    );
    assert_eq!(
        parts(&segments[3]),
        expected("    ", Some("XX"), Some("0"), "# abc1")
    );

    let auxiliary = &segments[2].auxiliary;
    assert_eq!(auxiliary.comment_lines, 2);
    assert_eq!(auxiliary.blank_lines, 0);
    assert_eq!(auxiliary.text, "    # a = 0\n    # b = 1 ##:\n");
    assert_eq!(segments[2].indentation_error, None);
}

#[test]
fn test_attribute_and_tuple_targets() {
    let cell = "\
C.x = 123 ##:
x, y = 123, 789 ##:
C.x, C.y = 123, 789 ##:

C.x.y.z = 123 ##:
C.z.z.z = 123 ##:

if 1:
    C.x = 123 ##:
    C.x, ABC, C.y = 123, 789, 456 ##:
";
    let segments = all_lines(cell);
    let targets: Vec<_> = segments
        .iter()
        .filter_map(|segments| segments.lhs.target_text.as_deref())
        .collect();
    assert_eq!(
        targets,
        vec![
            "C.x",
            "x, y",
            "C.x, C.y",
            "C.x.y.z",
            "C.z.z.z",
            "C.x",
            "C.x, ABC, C.y"
        ]
    );
    assert_eq!(
        parts(&segments[1]),
        expected("", Some("x, y"), Some("123, 789"), "##:")
    );
    assert_eq!(
        parts(&segments[3]),
        expected("", Some("C.x.y.z"), Some("123"), "##:")
    );
}

#[test]
fn test_tuple_with_attribute_target() {
    let segments = first_line("C.x, y = 123, 789 ##:");
    assert_eq!(segments.lhs.target_text.as_deref(), Some("C.x, y"));

    let segments = first_line("(a, b) = 1, 2 ##:");
    assert_eq!(segments.lhs.target_text.as_deref(), Some("a, b"));
}

#[test]
fn test_chained_assignment_reports_target_next_to_value() {
    let segments = first_line("y1, y2 = yy = 1, 2 ##:");
    assert_eq!(segments.lhs.target_text.as_deref(), Some("yy"));
    assert_eq!(segments.rhs.as_deref(), Some("1, 2"));

    let segments = first_line("yy = y1, y2 = 1, 2 ##:");
    assert_eq!(segments.lhs.target_text.as_deref(), Some("y1, y2"));
}

#[test]
fn test_augmented_and_annotated_assignments() {
    let segments = first_line("x += 1 ##:");
    assert_eq!(
        parts(&segments),
        expected("", Some("x"), Some("1"), "##:")
    );

    let segments = first_line("x: int = 5 ##:");
    assert_eq!(
        parts(&segments),
        expected("", Some("x"), Some("5"), "##:")
    );

    let segments = first_line("x: int ##:");
    assert_eq!(segments.lhs.target_text, None);
    assert_eq!(segments.rhs.as_deref(), Some("x: int"));
}

#[test]
fn test_unsupported_targets_are_deferred() {
    let segments = first_line("x, (y, z) = f()\n");
    assert_eq!(segments.lhs.target_text, None);
    assert_eq!(segments.rhs.as_deref(), Some("f()"));
    assert_eq!(
        segments.lhs.extraction_error,
        Some(RewriteError::UnsupportedTargetShape {
            target: "x, (y, z)".to_owned(),
            shape: "tuple",
        })
    );

    let shapes = [
        ("a[0] = 1", "subscript"),
        ("*a, b = 1, 2", "starred"),
        ("[a, b] = 1, 2", "list"),
        ("f().x = 1", "call"),
    ];
    for (cell, shape) in shapes {
        let error = first_line(cell).lhs.extraction_error;
        assert!(
            matches!(
                error,
                Some(RewriteError::UnsupportedTargetShape { shape: found, .. }) if found == shape
            ),
            "cell {cell:?} gave {error:?}"
        );
    }
}

#[test]
fn test_multiline_rhs_drops_inner_comments() {
    let cell = concat!(
        "z2 = [ 1,\n       2,\n       3 ]  ##:\n",
        "\n",
        "z3 = [ 1,  # some comment\n       2,  ##:\n       3 ] # more comments\n",
    );
    let lines = segment(cell);
    let segments = line_segments(&lines[1]);
    assert_eq!(segments.indent, "");
    assert_eq!(segments.lhs.target_text.as_deref(), Some("z3"));
    assert_eq!(
        segments.rhs.as_deref(),
        Some("[ 1,\n       2,\n       3 ]")
    );
    assert_eq!(segments.comment, "# some comment ##: # more comments");
    assert_eq!(segments.auxiliary.blank_lines, 1);
}

#[test]
fn test_indented_multiline_rhs_keeps_original_text() {
    let segments = all_lines("if 1:\n    z = [1,\n         2]  ##:\n");
    assert_eq!(
        parts(&segments[1]),
        expected("    ", Some("z"), Some("[1,\n         2]"), "##:")
    );
}

#[test]
fn test_unparsable_statement_has_no_target() {
    let segments = all_lines("if 1:\n    pass\n");
    assert_eq!(
        parts(&segments[0]),
        expected("", None, Some("if 1:"), "")
    );
}

#[test]
fn test_comment_at_end_of_indented_block_is_accepted() {
    let cell = "if 0:\n    pass\n    # some comment\n\n1 == 1\n";
    let segments = all_lines(cell);
    let last_statement = &segments[2];
    assert_eq!(last_statement.rhs.as_deref(), Some("1 == 1"));
    assert_eq!(last_statement.indentation_error, None);
    assert_eq!(last_statement.auxiliary.comment_lines, 1);
    assert_eq!(last_statement.auxiliary.blank_lines, 1);
    assert_eq!(last_statement.auxiliary.text, "    # some comment\n\n");
}

#[test]
fn test_comment_after_blank_line_in_indented_block_is_ambiguous() {
    let cell = "\
for k in range(N):

    pass

    #...

ng1, ng2, ng3 = len(g1), len(g2), len(g3)  ##:
g = cs.vertcat(g1_.reshape((-1, 1)), g2_.reshape((-1, 1)))
";
    let lines = segment(cell);
    let line = lines
        .iter()
        .find(|line| line.text.contains("ng1"))
        .expect("logical line with ng1");
    let segments = line_segments(line);

    assert_eq!(segments.lhs.target_text.as_deref(), Some("ng1, ng2, ng3"));
    let error = segments
        .indentation_error
        .expect("indentation ambiguity is recorded");
    assert!(
        error
            .to_string()
            .contains("comment line as last line of indented block"),
        "unexpected message: {error}"
    );
    assert!(matches!(
        error,
        RewriteError::IndentationAmbiguity { line: 3, .. }
    ));
}

#[test]
fn test_auxiliary_prefix_of_statement() {
    let lines = segment("x = 0\n\n# note\ny = 1 ##:\n");
    let segments = line_segments(&lines[1]);
    assert_eq!(segments.auxiliary.text, "\n# note\n");
    assert_eq!(segments.auxiliary.comment_lines, 1);
    assert_eq!(segments.auxiliary.blank_lines, 1);
    assert!(!segments.auxiliary.is_empty());
    assert_eq!(segments.comment, "##:");
    assert!(segments.is_assignment());
    assert!(segments.has_statement());
}

#[test]
fn test_common_margin() {
    assert_eq!(common_margin("    a\n      b\n\n    c\n"), "    ");
    assert_eq!(common_margin("    a\nb\n"), "");
    assert_eq!(common_margin("\t a\n\t b\n"), "\t ");
    assert_eq!(common_margin(""), "");
}

#[test]
fn test_blank_physical_lines() {
    assert!(is_blank("  \t\x0c\r\n"));
    assert!(is_blank(""));
    assert!(!is_blank("  # c\n"));
}

#[test]
fn test_tab_indented_statement() {
    let segments = all_lines("if 1:\n\ty = 1 ##:\n");
    assert_eq!(
        parts(&segments[1]),
        expected("\t", Some("y"), Some("1"), "##:")
    );
}

#[test]
fn test_ipython_help_line_is_a_statement() {
    let segments = all_lines("x?\ny = 2 ##:\n");
    assert_eq!(parts(&segments[0]), expected("", None, Some("x?"), ""));
    assert_eq!(
        parts(&segments[1]),
        expected("", Some("y"), Some("2"), "##:")
    );
}
