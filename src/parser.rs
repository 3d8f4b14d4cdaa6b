//! Text → `ChartData`.
//!
//! ```text
//! categories:
//! + <id>: <label> {<color>}
//! + <id>: {<color>}
//!
//! traces:
//! + <name> [<category>] // [<event>] <comment>
//! ++ <child> [<category>]
//! { <block opener>
//! + <child of the opener>
//! }
//! ```

mod category;
mod section;
mod trace;

use crate::diagnostics::{Diagnostics, ParseError, SearchWindow, Severity};
use crate::grammar::Grammar;
use crate::ir::{Categories, Category, ChartData, Origin, renumber_orders};
use crate::theme::palette_color;
use crate::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use category::parse_categories;
use trace::{TraceSection, parse_trace};

static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#[0-9a-f]{3,4}$|^#[0-9a-f]{6}$|^#[0-9a-f]{8}$|^[A-Za-z0-9_]+$").unwrap()
});

const ESCAPED: [char; 9] = ['\\', '{', '}', '[', ']', '/', ':', '<', '>'];

const IGNORED_SECTION: &str = "This part is ignored. Maybe you should add `traces:` before.";
const DUPLICATED_TRACES: &str = "Duplicated traces. This part will be ignored";
const UNKNOWN_SECTION: &str = "Unknown section";

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'a> {
    /// Categories carried over from an earlier render. Never modified.
    pub categories: Option<&'a Categories>,
    pub version: Version,
    /// Lines may start with a console filename token.
    pub console: bool,
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        Self {
            categories: None,
            version: Version::current(),
            console: false,
        }
    }
}

impl<'a> ParseOptions<'a> {
    pub fn with_categories(mut self, categories: &'a Categories) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }
}

/// Parses chart text. Positioned findings go to `diagnostics`; the only
/// error is a nesting jump of more than one level.
pub fn parse_chart(
    text: &str,
    options: &ParseOptions<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<ChartData, ParseError> {
    let grammar = Grammar::new(&options.version, options.console);
    let mut chart = ChartData::new();
    if let Some(seed) = options.categories {
        chart.categories = seed.clone();
    }
    chart
        .categories
        .retain(|_, category| category.origin != Origin::CodeCategory);
    renumber_orders(&mut chart.categories);

    let start = text.len() - text.trim_start().len();
    let end = start.max(text.trim_end().len());
    let sections = section::scan(text, start, end);
    let mut category_used: Vec<String> = Vec::new();

    if sections.is_empty() {
        let traces = parse_trace(text, &text[start..end], start, &grammar, diagnostics)?;
        chart.trace = traces.trace;
        category_used = traces.category_used;
    }

    let mut last = start;
    for section in &sections {
        report_gap(text, last, section.start, diagnostics);
        last = section.end;

        match section.name().as_str() {
            "categories" | "categorie" | "category" => {
                let parsed = parse_categories(
                    text,
                    section.body,
                    section.body_start,
                    &grammar,
                    diagnostics,
                );
                merge_declared(&mut chart.categories, parsed);
            }
            "traces" | "trace" => {
                if !chart.trace.is_empty() {
                    diagnostics.record(
                        text[section.start..section.end].trim(),
                        text,
                        DUPLICATED_TRACES,
                        Severity::Error,
                        SearchWindow::from(section.start),
                    );
                    continue;
                }
                let TraceSection {
                    trace,
                    category_used: used,
                } = parse_trace(text, section.body, section.body_start, &grammar, diagnostics)?;
                chart.trace = trace;
                category_used.extend(used);
            }
            _ => diagnostics.record(
                section.header,
                text,
                UNKNOWN_SECTION,
                Severity::Warning,
                SearchWindow::from(section.header_start),
            ),
        }
    }
    if !sections.is_empty() {
        report_gap(text, last, end, diagnostics);
    }

    reconcile(&mut chart.categories, &category_used);
    tracing::debug!(
        version = %options.version,
        categories = chart.categories.len(),
        roots = chart.trace.len(),
        diagnostics = diagnostics.len(),
        "parsed chart"
    );
    Ok(chart)
}

/// Declared categories replace anything except legend entries.
fn merge_declared(categories: &mut Categories, parsed: Vec<Category>) {
    for category in parsed {
        let keep_existing = categories
            .get(&category.key)
            .is_some_and(|existing| existing.origin == Origin::Legend);
        if !keep_existing {
            categories.insert(category.key.clone(), category);
        }
    }
}

/// Settles `used` flags, drops implied categories nothing references any
/// more, and creates entries for referenced keys that have none.
fn reconcile(categories: &mut Categories, category_used: &[String]) {
    let used: HashSet<&str> = category_used.iter().map(String::as_str).collect();
    categories.retain(|key, category| {
        if used.contains(key.as_str()) {
            category.used = true;
            true
        } else if category.origin == Origin::CodeTrace {
            false
        } else {
            category.used = false;
            true
        }
    });
    renumber_orders(categories);

    for key in category_used {
        if categories.contains_key(key) {
            continue;
        }
        let order = categories.len();
        let mut category = Category::new(key.clone(), palette_color(order), order, Origin::CodeTrace);
        category.used = true;
        categories.insert(key.clone(), category);
    }
}

fn report_gap(source: &str, from: usize, to: usize, diagnostics: &mut Diagnostics) {
    if from >= to {
        return;
    }
    let gap = source[from..to].trim();
    if !gap.is_empty() {
        diagnostics.record(gap, source, IGNORED_SECTION, Severity::Info, SearchWindow::from(from));
    }
}

/// Reports non-blank text of `body[from..to]` as ignored.
fn report_ignored(
    source: &str,
    body: &str,
    offset: usize,
    from: usize,
    to: usize,
    message: &str,
    diagnostics: &mut Diagnostics,
) {
    if from >= to {
        return;
    }
    let ignored = body[from..to].trim();
    if !ignored.is_empty() {
        diagnostics.record(
            ignored,
            source,
            message,
            Severity::Info,
            SearchWindow::from(offset + from),
        );
    }
}

pub fn is_valid_color(color: &str) -> bool {
    !color.is_empty() && COLOR_RE.is_match(color)
}

/// Prefixes every grammar-significant character with a backslash.
pub fn escape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ESCAPED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Drops the backslash of every `\x` pair. A trailing lone backslash stays.
pub fn unescape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) if next != '\n' => out.push(next),
            Some(next) => {
                out.push(ch);
                out.push(next);
            }
            None => out.push(ch),
        }
    }
    out
}
