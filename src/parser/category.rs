use super::{is_valid_color, report_ignored, unescape_label};
use crate::diagnostics::{Diagnostics, SearchWindow, Severity};
use crate::grammar::Grammar;
use crate::ir::{Category, Origin};
use crate::theme::palette_color;

const IGNORED_CATEGORY: &str =
    "This part is ignored. Expected pattern: \"+ <name>: <description> {#<color>}\"";
const WRONG_COLOR: &str = "Wrong color format (it should be `#RRGGBB` in hexadecimal)";

/// Parses the body of a `categories:` section found at `offset` in `source`.
///
/// Categories come back in declaration order with `origin = CodeCategory`
/// and `used = false`; usage is settled once the traces are known.
pub(super) fn parse_categories(
    source: &str,
    body: &str,
    offset: usize,
    grammar: &Grammar,
    diagnostics: &mut Diagnostics,
) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();
    let mut last = 0;

    for caps in grammar.category_line().captures_iter(body) {
        let Some(matched) = caps.get(0) else {
            continue;
        };
        report_ignored(source, body, offset, last, matched.start(), IGNORED_CATEGORY, diagnostics);
        last = matched.end();

        let key = unescape_label(caps.name("id").map_or("", |m| m.as_str()).trim());
        let label = unescape_label(caps.name("label").map_or("", |m| m.as_str()).trim());
        let raw_color = caps.name("color").map_or("#", |m| m.as_str());
        let color = unescape_label(raw_color.trim());

        let color = if is_valid_color(&color) {
            color
        } else {
            diagnostics.record(
                raw_color,
                source,
                WRONG_COLOR,
                Severity::Error,
                SearchWindow::from(offset + matched.start()),
            );
            palette_color(categories.len()).to_string()
        };

        if key.is_empty() {
            continue;
        }

        if let Some(existing) = categories.iter_mut().find(|category| category.key == key) {
            existing.label = label;
            existing.color = color;
            continue;
        }
        let order = categories.len();
        categories.push(Category::new(key, color, order, Origin::CodeCategory).with_label(label));
    }

    report_ignored(source, body, offset, last, body.len(), IGNORED_CATEGORY, diagnostics);
    tracing::debug!(count = categories.len(), "parsed category section");
    categories
}
