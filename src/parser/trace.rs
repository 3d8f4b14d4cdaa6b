use super::{report_ignored, unescape_label};
use crate::diagnostics::{Diagnostics, ParseError, SearchWindow, Severity, Span};
use crate::grammar::Grammar;
use crate::ir::Trace;
use std::collections::HashSet;

pub(super) const DEFAULT_CATEGORY: &str = "main";

const IGNORED_TRACE: &str =
    "This part is ignored. Expected pattern: \"+ <name> [<category>] // [<action>] <comment>\"";
const GRAND_CHILD: &str =
    "The line seems to be the grand-child of the precedent line. Please verify the number of \"+\".";

#[derive(Debug, Default)]
pub(super) struct TraceSection {
    pub trace: Vec<Trace>,
    /// Referenced category keys, in order of first reference.
    pub category_used: Vec<String>,
}

#[derive(Debug, Default)]
struct UsedCategories {
    seen: HashSet<String>,
    keys: Vec<String>,
}

impl UsedCategories {
    fn insert(&mut self, key: &str) {
        if self.seen.insert(key.to_string()) {
            self.keys.push(key.to_string());
        }
    }
}

/// How a line's leading marker moves the nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// `+`, `++`, ...: depth below the current block base.
    Plus(usize),
    /// `{` or `+..+{`: opens that many levels.
    Open(usize),
    /// `}`: closes the most recent block.
    Close,
}

impl Marker {
    fn parse(token: &str) -> Self {
        match token {
            "{" => Self::Open(1),
            "}" => Self::Close,
            _ if token.ends_with('{') => Self::Open(token.len() - 1),
            _ => Self::Plus(token.len()),
        }
    }

    fn is_brace(&self) -> bool {
        !matches!(self, Self::Plus(_))
    }
}

/// Block bookkeeping for brace nesting.
#[derive(Debug, Default)]
struct Blocks {
    base: usize,
    opened: Vec<usize>,
}

impl Blocks {
    /// Absolute level for a line carrying `marker`.
    fn level(&mut self, marker: Marker) -> usize {
        match marker {
            Marker::Plus(count) => self.base + count - 1,
            Marker::Open(levels) => {
                let level = self.base + levels - 1;
                self.base += levels;
                self.opened.push(levels);
                level
            }
            Marker::Close => {
                let levels = self.opened.pop().unwrap_or(0);
                self.base = self.base.saturating_sub(levels);
                self.base
            }
        }
    }
}

/// Flat node store; children always sit after their parent.
#[derive(Debug)]
struct Node {
    trace: Trace,
    children: Vec<usize>,
}

/// Parses a traces body found at `offset` in `source` into a forest.
pub(super) fn parse_trace(
    source: &str,
    body: &str,
    offset: usize,
    grammar: &Grammar,
    diagnostics: &mut Diagnostics,
) -> Result<TraceSection, ParseError> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut blocks = Blocks::default();
    let mut used = UsedCategories::default();
    let mut last = 0;

    for caps in grammar.trace_line().captures_iter(body) {
        let Some(matched) = caps.get(0) else {
            continue;
        };
        report_ignored(source, body, offset, last, matched.start(), IGNORED_TRACE, diagnostics);
        last = matched.end();

        let indentation = caps.name("indentation").map_or("+", |m| m.as_str());
        let field = |name: &str| unescape_label(caps.name(name).map_or("", |m| m.as_str()).trim());
        let name = field("name");
        let category = field("category");
        let event = field("event");
        let comment = field("comment");

        let marker = Marker::parse(indentation);
        let level = blocks.level(marker);
        if marker.is_brace() && name.is_empty() && event.is_empty() && comment.is_empty() {
            continue;
        }

        if !category.is_empty() {
            used.insert(&category);
        }

        if level > stack.len() {
            let line = matched.as_str().trim();
            diagnostics.record(
                indentation,
                source,
                GRAND_CHILD,
                Severity::Error,
                SearchWindow::within(matched.as_str(), offset + matched.start()),
            );
            return Err(ParseError::GrandChild {
                line: line.to_string(),
                span: Span::new(offset + matched.start(), offset + matched.end()),
            });
        }

        let idx = nodes.len();
        let parent = level.checked_sub(1).and_then(|slot| stack.get(slot).copied());
        stack.truncate(level);
        stack.push(idx);

        let mut trace = Trace {
            name,
            category,
            event: non_empty(event),
            comment: non_empty(comment),
            sub_tasks: Vec::new(),
        };
        match parent {
            Some(parent) => {
                if trace.category.is_empty() {
                    trace.category = nodes[parent].trace.category.clone();
                }
                nodes[parent].children.push(idx);
            }
            None => {
                if trace.category.is_empty() {
                    trace.category = DEFAULT_CATEGORY.to_string();
                    used.insert(DEFAULT_CATEGORY);
                }
                roots.push(idx);
            }
        }
        nodes.push(Node {
            trace,
            children: Vec::new(),
        });
    }

    report_ignored(source, body, offset, last, body.len(), IGNORED_TRACE, diagnostics);
    tracing::debug!(nodes = nodes.len(), roots = roots.len(), "parsed trace section");

    Ok(TraceSection {
        trace: assemble(nodes, &roots),
        category_used: used.keys,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Builds the forest bottom-up: walking the store backwards guarantees every
/// child is finished before its parent claims it.
fn assemble(nodes: Vec<Node>, roots: &[usize]) -> Vec<Trace> {
    let mut built: Vec<Option<Trace>> = Vec::with_capacity(nodes.len());
    let mut children: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());
    for node in nodes {
        built.push(Some(node.trace));
        children.push(node.children);
    }
    for idx in (0..built.len()).rev() {
        let sub_tasks: Vec<Trace> = children[idx]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        if let Some(trace) = built[idx].as_mut() {
            trace.sub_tasks = sub_tasks;
        }
    }
    roots.iter().filter_map(|root| built[*root].take()).collect()
}
