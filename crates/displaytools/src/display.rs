//! Display formatting
//!
//! The generated lines call three helpers in the executing namespace. This
//! module implements what those helpers do with an already formatted value: a
//! mime bundle maps each mime type to the value's representation in it.

use std::io;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Line width used when the host does not configure one
pub const DEFAULT_LINE_WIDTH: usize = 75;

/// Longest string representation quoted by [`info`], in characters
const INFO_REPR_LIMIT: usize = 60;

/// Representations of one value, keyed by mime type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeBundle(IndexMap<String, String>);

impl MimeBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle with a single `text/plain` entry
    pub fn plain(text: impl Into<String>) -> Self {
        let mut bundle = Self::new();
        bundle.insert("text/plain", text);
        bundle
    }

    pub fn insert(&mut self, mime: impl Into<String>, data: impl Into<String>) {
        self.0.insert(mime.into(), data.into());
    }

    pub fn get(&self, mime: &str) -> Option<&str> {
        self.0.get(mime).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(mime, data)| (mime.as_str(), data.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MimeBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(mime, data)| (mime.into(), data.into()))
                .collect(),
        )
    }
}

/// Receiver of display data, e.g. a notebook frontend
pub trait DisplayPublisher {
    fn publish(&mut self, bundle: &MimeBundle) -> io::Result<()>;
}

/// Publisher that writes the `text/plain` representation to a stream
#[derive(Debug)]
pub struct TextPublisher<W> {
    out: W,
}

impl<W: io::Write> TextPublisher<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> DisplayPublisher for TextPublisher<W> {
    fn publish(&mut self, bundle: &MimeBundle) -> io::Result<()> {
        match bundle.get("text/plain") {
            Some(text) => writeln!(self.out, "{text}"),
            None => {
                log::debug!("Nothing to print for bundle without text/plain");
                Ok(())
            }
        }
    }
}

/// Publish `bundle` unchanged.
pub fn display(publisher: &mut impl DisplayPublisher, bundle: &MimeBundle) -> io::Result<()> {
    publisher.publish(bundle)
}

/// Publish `bundle` with `label := ` merged into its representations.
pub fn custom_display(
    publisher: &mut impl DisplayPublisher,
    label: &str,
    bundle: &MimeBundle,
    line_width: usize,
) -> io::Result<()> {
    publisher.publish(&merge_label(label, bundle, line_width))
}

/// Merge `label` into the plain text and LaTeX representations.
///
/// Other mime types (images, html, ...) are passed through untouched.
pub fn merge_label(label: &str, bundle: &MimeBundle, line_width: usize) -> MimeBundle {
    bundle
        .iter()
        .map(|(mime, data)| {
            let merged = if mime.contains("text/plain") {
                let prefix = format!("{label} := ");
                if data.starts_with("array") || data.starts_with("matrix") {
                    format!(
                        "{prefix}{}",
                        format_array_repr(data, prefix.len(), line_width)
                    )
                } else {
                    format!("{prefix}{data}")
                }
            } else if mime.contains("text/latex") {
                match data.strip_prefix("$$") {
                    Some(formula) => format!("$$\\verb|{label}| := {formula}"),
                    None => format!("{label} := {data}"),
                }
            } else {
                data.to_owned()
            };
            (mime, merged)
        })
        .collect()
}

/// Re-wrap a multi-row array representation to follow a prefix of
/// `prefix_len` characters.
///
/// Rows are shifted right to stay aligned with the first one. If the first row
/// would then exceed `line_width`, the array starts on a new line instead.
pub fn format_array_repr(value: &str, prefix_len: usize, line_width: usize) -> String {
    let rows: Vec<&str> = value.split('\n').collect();
    let first_width = rows.first().map_or(0, |row| row.chars().count());

    if first_width + prefix_len > line_width {
        format!("\n{}", rows.join("\n"))
    } else {
        rows.join(&format!("\n{}", " ".repeat(prefix_len)))
    }
}

/// What is known about a value for its one-line summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueInfo {
    /// Type as printed by the host, e.g. `<class 'int'>`
    pub type_name: String,
    /// Numeric value, for values that compare equal to their float conversion
    pub number: Option<String>,
    /// Operation count of symbolic expressions
    pub count_ops: Option<String>,
    pub shape: Option<Vec<usize>>,
    pub length: Option<usize>,
    /// String conversion of the value
    pub repr: String,
}

/// One-line summary: type plus the most telling attribute.
pub fn info(value: &ValueInfo) -> String {
    let (what, detail) = if let Some(number) = &value.number {
        ("value", number.clone())
    } else if let Some(count_ops) = &value.count_ops {
        ("count_ops", count_ops.clone())
    } else if let Some(shape) = &value.shape {
        ("shape", format_shape(shape))
    } else if let Some(length) = value.length {
        ("length", length.to_string())
    } else {
        ("str repr", truncate(&value.repr, INFO_REPR_LIMIT))
    };
    format!("{} with {what}: {detail}", value.type_name)
}

/// Shape as a Python tuple: `(3,)`, `(12, 15)`
fn format_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({single},)"),
        dims => {
            let dims: Vec<String> = dims.iter().map(ToString::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}
