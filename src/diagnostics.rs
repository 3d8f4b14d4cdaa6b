use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Byte range into the text handed to `parse_chart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// One-based line and column (in characters) of the span start.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let start = floor_char_boundary(source, self.start);
        let before = &source[..start];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub excerpt: String,
    pub message: String,
    pub severity: Severity,
}

/// Where to look for an excerpt inside the full text.
///
/// The search starts at `start`. With `within`, the window text is located
/// first (from `start`) and the excerpt is then searched inside it, which
/// pins short excerpts such as a lone `+` to the right line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchWindow<'a> {
    pub start: usize,
    pub within: Option<&'a str>,
}

impl<'a> SearchWindow<'a> {
    pub fn from(start: usize) -> Self {
        Self {
            start,
            within: None,
        }
    }

    pub fn within(section: &'a str, start: usize) -> Self {
        Self {
            start,
            within: Some(section),
        }
    }
}

/// Append-only list of positioned records produced by one parse call.
///
/// Records are kept in discovery order. Callers drain the sink between
/// parses; nothing here is shared across calls.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locates `excerpt` in `source` and appends a record.
    ///
    /// An excerpt that cannot be found is dropped after a debug log; it
    /// never reaches the caller.
    pub fn record(
        &mut self,
        excerpt: &str,
        source: &str,
        message: impl Into<String>,
        severity: Severity,
        window: SearchWindow<'_>,
    ) {
        let message = message.into();
        let Some(span) = locate(excerpt, source, window) else {
            tracing::debug!(
                excerpt,
                start = window.start,
                %severity,
                note = message.as_str(),
                "diagnostic excerpt not found in source, record dropped"
            );
            return;
        };
        self.push(Diagnostic {
            span,
            excerpt: excerpt.to_string(),
            message,
            severity,
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.records.clone()
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|record| record.severity == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

fn locate(excerpt: &str, source: &str, window: SearchWindow<'_>) -> Option<Span> {
    let start = window.start;
    if start > source.len() || !source.is_char_boundary(start) {
        return None;
    }
    let mut from = start;
    let mut haystack = &source[start..];
    if let Some(section) = window.within {
        let section_start = haystack.find(section)?;
        from += section_start;
        haystack = &haystack[section_start..section_start + section.len()];
    }
    let idx = haystack.find(excerpt)?;
    let begin = from + idx;
    Some(Span::new(begin, begin + excerpt.len()))
}

fn floor_char_boundary(source: &str, idx: usize) -> usize {
    let mut idx = idx.min(source.len());
    while !source.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// The one hard failure of the grammar. No partial chart survives it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(
        "A line seems to be the grand-child of the precedent line. Please verify the number of \"+\".\n \"{line}\""
    )]
    GrandChild { line: String, span: Span },
}
