use once_cell::sync::Lazy;
use regex::Regex;

/// `<word>:` alone on its line.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[A-Za-z0-9_]+:\s*$").unwrap());
/// Any line that starts like a header; it ends the running section body.
static HEADER_LIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*[A-Za-z0-9_]+:").unwrap());

/// One `<word>:` block. Offsets index the full parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Section<'a> {
    pub header: &'a str,
    pub header_start: usize,
    pub body: &'a str,
    pub body_start: usize,
    pub start: usize,
    pub end: usize,
}

impl Section<'_> {
    /// Lowercased header word, colon stripped.
    pub fn name(&self) -> String {
        self.header.trim_end_matches(':').trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    text: &'a str,
}

impl Line<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Splits `source[start..end]` into sections.
///
/// A header directly followed by another header is not a section; one on
/// the last line is a section with an empty body. Body lines run until the
/// next line that starts like a header; lines beginning with `+` never do.
pub(super) fn scan(source: &str, start: usize, end: usize) -> Vec<Section<'_>> {
    let lines = split_lines(source, start, end);
    let mut sections = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let followed_by_header = lines
            .get(idx + 1)
            .is_some_and(|next| HEADER_LIKE_RE.is_match(next.text));
        if !HEADER_RE.is_match(line.text) || followed_by_header {
            idx += 1;
            continue;
        }

        let mut last = idx;
        while last + 1 < lines.len() && !HEADER_LIKE_RE.is_match(lines[last + 1].text) {
            last += 1;
        }

        let trimmed = line.text.trim();
        let header_start = line.start + (line.text.len() - line.text.trim_start().len());
        let body_start = line.end();
        let body_end = lines[last].end();
        sections.push(Section {
            header: trimmed,
            header_start,
            body: &source[body_start..body_end],
            body_start,
            start: line.start,
            end: body_end,
        });
        idx = last + 1;
    }
    sections
}

fn split_lines(source: &str, start: usize, end: usize) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = start;
    for raw in source[start..end].split('\n') {
        lines.push(Line {
            start: offset,
            text: raw,
        });
        offset += raw.len() + 1;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        scan(text, 0, text.len()).iter().map(Section::name).collect()
    }

    #[test]
    fn finds_both_sections() {
        let text = "categories:\n+ web: {#f00}\n\ntraces:\n+ a [web]\n++ b";
        let sections = scan(text, 0, text.len());
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name(), "categories");
        assert_eq!(sections[0].body, "\n+ web: {#f00}\n");
        assert_eq!(sections[1].header, "traces:");
        assert_eq!(sections[1].body, "\n+ a [web]\n++ b");
        assert_eq!(&text[sections[1].body_start..sections[1].end], sections[1].body);
    }

    #[test]
    fn header_followed_by_header_is_not_a_section() {
        assert_eq!(names("categories:\ntraces:\n+ a"), vec!["traces"]);
    }

    #[test]
    fn trailing_header_has_an_empty_body() {
        let text = "categories:\n+ web: {#fff}\n\ntraces:";
        let sections = scan(text, 0, text.len());
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].header, "traces:");
        assert_eq!(sections[1].body, "");
        assert_eq!(sections[1].body_start, text.len());
        assert_eq!(sections[1].end, text.len());
    }

    #[test]
    fn plus_lines_with_colons_stay_in_body() {
        let text = "categories:\n+ web: x {#fff}\n+ db: {#000}";
        let sections = scan(text, 0, text.len());
        assert_eq!(sections.len(), 1);
        assert!(sections[0].body.contains("+ db"));
    }

    #[test]
    fn header_like_text_ends_body() {
        let text = "traces:\n+ a\nnote: nothing\n+ b";
        let sections = scan(text, 0, text.len());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, "\n+ a");
        assert_eq!(sections[0].end, 11);
    }

    #[test]
    fn scans_a_sub_range() {
        let text = "   Traces: \n+ a\n  ";
        let sections = scan(text, 3, 15);
        assert_eq!(sections[0].name(), "traces");
        assert_eq!(sections[0].header_start, 3);
        assert_eq!(sections[0].body, "\n+ a");
    }
}
