//! Positional error and warning records.
//!
//! Decoding and validation never fail with a Rust error: every problem is a
//! [`Diagnostic`] in a [`Diagnostics`] list, optionally pointing at a
//! [`SourceRange`] in the configuration text.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

/// A position in source text. Lines and columns are 1-based, columns count
/// characters; `byte` is the 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

impl Pos {
    /// Start of a file.
    pub const START: Self = Self {
        line: 1,
        column: 1,
        byte: 0,
    };
}

impl Default for Pos {
    fn default() -> Self {
        Self::START
    }
}

/// A half-open span of source text in a named file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl SourceRange {
    /// Creates a range.
    pub fn new(filename: impl Into<String>, start: Pos, end: Pos) -> Self {
        Self {
            filename: filename.into(),
            start,
            end,
        }
    }

    /// Returns the smallest range covering both `self` and `other`.
    pub fn to(&self, other: &SourceRange) -> SourceRange {
        SourceRange {
            filename: self.filename.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Zero-width range at the start of `self`.
    pub fn start_range(&self) -> SourceRange {
        SourceRange {
            filename: self.filename.clone(),
            start: self.start,
            end: self.start,
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.filename, self.start.line, self.start.column
        )
    }
}

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The result must not be used.
    Error,
    /// Advisory only.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// A single error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
}

impl Diagnostic {
    /// Creates an error without a range.
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            range: None,
        }
    }

    /// Creates a warning without a range.
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            range: None,
        }
    }

    /// Attaches a source range.
    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Returns `true` for error severity.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Renders the diagnostic with a pointer into `source` when available.
    ///
    /// ```text
    /// error: Missing required attribute
    ///   --> site.conf:3:1
    ///    |
    ///  3 | content text {
    ///    | ^^^^^^^
    ///    = The attribute "value" is required, but no definition was found.
    /// ```
    pub fn render(&self, source: Option<&str>) -> String {
        let mut out = format!("{}: {}\n", self.severity, self.summary);
        let Some(range) = &self.range else {
            if !self.detail.is_empty() {
                let _ = writeln!(out, "  = {}", self.detail);
            }
            return out;
        };

        let _ = writeln!(out, "  --> {range}");
        let line_text = source.and_then(|src| src.lines().nth(range.start.line.saturating_sub(1)));
        if let Some(text) = line_text {
            let gutter = range.start.line.to_string().len();
            let pad = " ".repeat(gutter);
            let width = if range.end.line == range.start.line && range.end.column > range.start.column
            {
                range.end.column - range.start.column
            } else {
                1
            };
            let _ = writeln!(out, " {pad} |");
            let _ = writeln!(out, " {} | {text}", range.start.line);
            let _ = writeln!(
                out,
                " {pad} | {}{}",
                " ".repeat(range.start.column.saturating_sub(1)),
                "^".repeat(width)
            );
            if !self.detail.is_empty() {
                let _ = writeln!(out, " {pad} = {}", self.detail);
            }
        } else if !self.detail.is_empty() {
            let _ = writeln!(out, "  = {}", self.detail);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(range) = &self.range {
            write!(f, "{range}: ")?;
        }
        write!(f, "{}: {}", self.severity, self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "; {}", self.detail)?;
        }
        Ok(())
    }
}

/// An ordered list of diagnostics.
///
/// # Examples
///
/// ```
/// use blockspec_core::{Diagnostic, Diagnostics};
///
/// let mut diags = Diagnostics::new();
/// diags.push(Diagnostic::warning("Deprecated attribute", "use `title` instead"));
/// assert!(!diags.has_errors());
/// diags.push(Diagnostic::error("Missing required attribute", "`value` is required"));
/// assert!(diags.has_errors());
/// assert_eq!(diags.errors().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Appends all diagnostics from `other`.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(other);
    }

    /// Returns `true` if any entry has error severity.
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Iterates over error entries.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    /// Iterates over warning entries.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    /// Iterates over all entries.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sets `range` on every entry that has none.
    pub fn with_range(mut self, range: &SourceRange) -> Self {
        for diagnostic in &mut self.0 {
            if diagnostic.range.is_none() {
                diagnostic.range = Some(range.clone());
            }
        }
        self
    }

    /// Renders every entry against the given source text.
    pub fn render(&self, source: Option<&str>) -> String {
        self.0.iter().map(|d| d.render(source)).collect()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(list: Vec<Diagnostic>) -> Self {
        Self(list)
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(line: usize, column: usize, len: usize) -> SourceRange {
        SourceRange::new(
            "main.conf",
            Pos {
                line,
                column,
                byte: 0,
            },
            Pos {
                line,
                column: column + len,
                byte: 0,
            },
        )
    }

    #[test]
    fn test_render_points_at_source() {
        let source = "title = 1\ncount = \"x\"\n";
        let diag = Diagnostic::error("Incorrect attribute value type", "a number is required")
            .with_range(range(2, 9, 3));
        let rendered = diag.render(Some(source));
        assert!(rendered.starts_with("error: Incorrect attribute value type\n"));
        assert!(rendered.contains("--> main.conf:2:9"));
        assert!(rendered.contains(" 2 | count = \"x\""));
        assert!(rendered.contains("   |         ^^^"));
        assert!(rendered.contains("= a number is required"));
    }

    #[test]
    fn test_render_without_range() {
        let diag = Diagnostic::warning("Missing example", "add an example");
        assert_eq!(diag.render(None), "warning: Missing example\n  = add an example\n");
    }

    #[test]
    fn test_with_range_fills_only_missing() {
        let first = Diagnostic::error("a", "").with_range(range(1, 1, 1));
        let diags: Diagnostics = vec![first.clone(), Diagnostic::error("b", "")].into();
        let filled = diags.with_range(&range(5, 2, 1));
        let ranges: Vec<_> = filled.iter().map(|d| d.range.clone().unwrap()).collect();
        assert_eq!(ranges[0], first.range.unwrap());
        assert_eq!(ranges[1].start.line, 5);
    }

    #[test]
    fn test_display_includes_location() {
        let diag = Diagnostic::error("Duplicate block", "only one allowed").with_range(range(3, 1, 4));
        assert_eq!(
            diag.to_string(),
            "main.conf:3:1: error: Duplicate block; only one allowed"
        );
    }
}
