//! Special comment markers
//!
//! A trailing comment such as `##:` or `##:S` asks for the value of the line to
//! be displayed. The registry below fixes both the vocabulary and the order in
//! which the literals are tested: `##:` is a prefix of several other markers and
//! must therefore come last.

use std::fmt;

/// Behaviour requested by a special comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// `##;` display the value without a label
    Plain,
    /// `##T` display the transposed value
    Transpose,
    /// `##:T` labeled display of the transposed value
    LabelTranspose,
    /// `##:S` labeled display of the shape
    LabelShape,
    /// `##:i` labeled one-line info summary
    LabelInfo,
    /// `##:` labeled display
    Label,
}

impl MarkerKind {
    /// Literal text of the marker
    pub const fn literal(self) -> &'static str {
        match self {
            Self::Plain => "##;",
            Self::Transpose => "##T",
            Self::LabelTranspose => "##:T",
            Self::LabelShape => "##:S",
            Self::LabelInfo => "##:i",
            Self::Label => "##:",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// Registry entry: the marker together with the flags it switches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialMarker {
    pub kind: MarkerKind,
    pub label: bool,
    pub transpose: bool,
    pub shape: bool,
    pub info: bool,
}

impl SpecialMarker {
    const fn new(kind: MarkerKind) -> Self {
        Self {
            kind,
            label: false,
            transpose: false,
            shape: false,
            info: false,
        }
    }

    const fn labeled(mut self) -> Self {
        self.label = true;
        self
    }

    const fn transposed(mut self) -> Self {
        self.transpose = true;
        self
    }

    pub const fn literal(&self) -> &'static str {
        self.kind.literal()
    }
}

/// Known markers in precedence order.
pub static REGISTRY: [SpecialMarker; 6] = [
    SpecialMarker::new(MarkerKind::Plain),
    SpecialMarker::new(MarkerKind::Transpose).transposed(),
    SpecialMarker::new(MarkerKind::LabelTranspose)
        .labeled()
        .transposed(),
    SpecialMarker {
        shape: true,
        ..SpecialMarker::new(MarkerKind::LabelShape).labeled()
    },
    SpecialMarker {
        info: true,
        ..SpecialMarker::new(MarkerKind::LabelInfo).labeled()
    },
    SpecialMarker::new(MarkerKind::Label).labeled(),
];

/// A comment consisting of just this sigil is a plain marker
const LEGACY_SIGIL: &str = "##";

/// Flags derived from the trailing comment of a logical line
///
/// `is_assignment` and `is_comment_only_line` describe the statement rather
/// than the comment and are filled in by the rewriter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFlags {
    pub marker: Option<MarkerKind>,
    pub has_marker: bool,
    pub is_empty_comment: bool,
    pub wants_label: bool,
    pub wants_transpose: bool,
    pub wants_shape: bool,
    pub wants_info: bool,
    pub is_comment_only_line: bool,
    pub is_assignment: Option<bool>,
    /// Markers that also matched but were shadowed by `marker`
    pub multi_match: Vec<MarkerKind>,
}

impl CommentFlags {
    fn from_marker(marker: &SpecialMarker) -> Self {
        Self {
            marker: Some(marker.kind),
            has_marker: true,
            wants_label: marker.label,
            wants_transpose: marker.transpose,
            wants_shape: marker.shape,
            wants_info: marker.info,
            ..Self::default()
        }
    }
}

/// Match `comment` against the marker registry.
///
/// The first registered literal contained in the comment governs, every later
/// hit is recorded in `multi_match` without effect.
pub fn classify_comment(comment: &str) -> CommentFlags {
    if comment.is_empty() {
        return CommentFlags {
            is_empty_comment: true,
            ..CommentFlags::default()
        };
    }

    let mut flags: Option<CommentFlags> = None;
    for marker in &REGISTRY {
        if !comment.contains(marker.literal()) {
            continue;
        }
        match flags.as_mut() {
            Some(flags) => flags.multi_match.push(marker.kind),
            None => flags = Some(CommentFlags::from_marker(marker)),
        }
    }

    if let Some(flags) = flags {
        if !flags.multi_match.is_empty() {
            log::trace!(
                "Comment {comment:?}: marker {:?} shadows {:?}",
                flags.marker,
                flags.multi_match
            );
        }
        return flags;
    }

    if comment.trim() == LEGACY_SIGIL {
        return CommentFlags::from_marker(&REGISTRY[0]);
    }

    CommentFlags::default()
}
